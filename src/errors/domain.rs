//! Domain-level error type used across services, repos and adapters.
//!
//! This error type is transport- and DB-agnostic. The presentation layer
//! (bot commands, buttons) is expected to map `DomainError` onto whatever
//! user-facing rendering it needs; nothing here knows about that layer.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Infra error kinds to distinguish operational failures
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InfraErrorKind {
    Timeout,
    DbUnavailable,
    /// A stored record violates an invariant the code relies on
    /// (e.g. a FINISHED duel without a stake, or `finished_at` that
    /// could not be written against a FINISHED status).
    DataCorruption,
    /// Payload blob could not be parsed, resolved, or written
    /// (CAS retries exhausted, unknown envelope version, incomplete
    /// payload handed to `resolve`).
    Payload,
    Other(String),
}

/// Domain-level not found entities
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Duel,
    Member,
    Other(String),
}

/// Validation failure kinds raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationKind {
    /// Challenger and challenged member are the same account.
    SamePlayerDuel,
    /// Game type key not present in the registry.
    InvalidGameType,
    /// Stake outside the configured denomination set.
    InvalidStake,
    /// Stake exceeds a participant's current balance.
    InsufficientXp,
    /// Invite requested before game type and stake are both set.
    ConfigurationIncomplete,
    /// Invite requested without a presentation-layer message reference.
    MissingMessageRef,
    /// Move value not recognized by the game engine.
    InvalidMove,
    /// Result value not one of the known outcomes.
    InvalidResult,
    Other(String),
}

/// State-conflict kinds: the caller lost a legitimate race or acted on a
/// session that is no longer in the state the operation requires. These are
/// never retried blindly; callers that know a given conflict is benign
/// (`AlreadyHandled`, `NotFinishable` at the finish seam) handle it
/// explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    /// A conditional status transition affected zero rows: another actor
    /// already moved this session.
    AlreadyHandled,
    /// Accept/refuse on a session that is not INVITED.
    NotAcceptable,
    /// Finish requested for a session that is not ACTIVE.
    NotFinishable,
    /// In-game action on a session that is not ACTIVE.
    NotActive,
    /// Action routed to a session configured for a different game type,
    /// or played before any game type was configured.
    WrongGameType,
    /// The acting player already submitted their move.
    AlreadyPlayed,
    /// The member already has an INVITED or ACTIVE session in this space.
    AlreadyInDuel,
    /// The session's `expires_at` has passed.
    Expired,
    /// A conditional CONFIG-phase field write affected zero rows.
    StaleConfig,
    Other(String),
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input/user validation or business rule violation
    Validation(ValidationKind, String),
    /// Acting member is not allowed to perform this operation
    Unauthorized(String),
    /// Semantic conflict (optimistic-concurrency losers, stale state)
    Conflict(ConflictKind, String),
    /// Missing resource in domain terms
    NotFound(NotFoundKind, String),
    /// Infrastructure/operational failures
    Infra(InfraErrorKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(kind, d) => write!(f, "validation {kind:?}: {d}"),
            DomainError::Unauthorized(d) => write!(f, "unauthorized: {d}"),
            DomainError::Conflict(kind, d) => write!(f, "conflict {kind:?}: {d}"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
            DomainError::Infra(kind, d) => write!(f, "infra {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(kind: ValidationKind, detail: impl Into<String>) -> Self {
        Self::Validation(kind, detail.into())
    }
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::Unauthorized(detail.into())
    }
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }
    pub fn infra(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Infra(kind, detail.into())
    }

    /// True for the two conflicts the coordinator and the sweeper treat as
    /// benign at the finish seam: someone else settled the session first.
    pub fn is_finish_race(&self) -> bool {
        matches!(
            self,
            DomainError::Conflict(ConflictKind::AlreadyHandled, _)
                | DomainError::Conflict(ConflictKind::NotFinishable, _)
        )
    }
}
