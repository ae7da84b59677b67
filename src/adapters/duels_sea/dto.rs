//! DTOs for the duels_sea adapter.

use time::OffsetDateTime;

use crate::entities::duels::DuelStatus;

/// DTO for creating a new duel session.
#[derive(Debug, Clone)]
pub struct DuelCreate {
    pub space_id: i64,
    pub channel_id: i64,
    pub player_a_id: i64,
    pub player_b_id: i64,
    pub expires_at: OffsetDateTime,
    /// Serialized payload envelope.
    pub payload: String,
}

/// Conditional status transition: applies only while the stored status still
/// equals `from`. A zero-row result means another actor moved the session.
#[derive(Debug, Clone)]
pub struct DuelTransition {
    pub id: i64,
    pub from: DuelStatus,
    pub to: DuelStatus,
    /// Three-state: None = no change, Some(Some(ts)) = set, Some(None) = clear.
    pub expires_at: Option<Option<OffsetDateTime>>,
    pub message_ref: Option<String>,
    pub finished_at: Option<OffsetDateTime>,
}

impl DuelTransition {
    pub fn new(id: i64, from: DuelStatus, to: DuelStatus) -> Self {
        Self {
            id,
            from,
            to,
            expires_at: None,
            message_ref: None,
            finished_at: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(Some(expires_at));
        self
    }

    pub fn clear_expires_at(mut self) -> Self {
        self.expires_at = Some(None);
        self
    }

    pub fn with_message_ref(mut self, message_ref: impl Into<String>) -> Self {
        self.message_ref = Some(message_ref.into());
        self
    }

    pub fn with_finished_at(mut self, finished_at: OffsetDateTime) -> Self {
        self.finished_at = Some(finished_at);
        self
    }
}

/// Retention cutoffs for the physical delete pass.
#[derive(Debug, Clone, Copy)]
pub struct RetentionCutoffs {
    /// EXPIRED and CANCELLED sessions finished before this are deleted.
    pub expired_before: OffsetDateTime,
    /// FINISHED sessions finished before this are deleted.
    pub finished_before: OffsetDateTime,
}
