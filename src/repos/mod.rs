pub mod duels;
pub mod ledger;
