pub mod duels;
pub mod member_xp;
