//! Pure duel domain logic: payload envelope, outcomes, level curve and
//! snapshot projection. Nothing in this module touches the database.

pub mod levels;
pub mod outcome;
pub mod payload;
pub mod snapshot;

pub use levels::{level_changes, level_for_xp, LevelChange};
pub use outcome::{DuelOutcome, PlayerSlot};
pub use payload::{DuelPayload, XpBaseline, PAYLOAD_VERSION};
pub use snapshot::{DuelEffects, DuelPublic, DuelSnapshot, UiInfo};
