pub mod duel_flow;
pub mod gameplay;
pub mod sweeper;

pub use duel_flow::DuelFlowService;
pub use gameplay::GameplayService;
pub use sweeper::{MaintenanceSweeper, SweptDuel};
