pub mod duels_sea;
pub mod ledger_sea;
