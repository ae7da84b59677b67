pub mod duels;

pub use duels::DuelConfig;
