//! XP -> level curve and level-change detection.
//!
//! The surrounding bot derives a member's displayed rank from total XP;
//! after a payout the presentation layer needs to know whose rank moved.
//! Level L is reached at `100 * L * L` total XP.

use serde::{Deserialize, Serialize};

/// A member whose derived level moved as a result of a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub member_id: i64,
    pub old_level: u32,
    pub new_level: u32,
}

/// Level for a given total XP. Negative balances clamp to level 0.
pub fn level_for_xp(xp: i64) -> u32 {
    if xp <= 0 {
        return 0;
    }
    // 100*L*L <= xp iff L*L <= xp/100, both sides integral.
    (xp / 100).isqrt() as u32
}

/// Level changes for the given members between two balance readings.
/// Members whose level did not move are omitted.
pub fn level_changes(members: &[(i64, i64, i64)]) -> Vec<LevelChange> {
    members
        .iter()
        .filter_map(|&(member_id, before, after)| {
            let old_level = level_for_xp(before);
            let new_level = level_for_xp(after);
            (old_level != new_level).then_some(LevelChange {
                member_id,
                old_level,
                new_level,
            })
        })
        .collect()
}
