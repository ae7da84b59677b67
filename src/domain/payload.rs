//! Versioned in-memory form of the opaque payload blob.
//!
//! The store only ever sees serialized text; this envelope is parsed
//! immediately on load and re-serialized before every compare-and-swap
//! write. Untyped payload never crosses a component boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::domain::{DomainError, InfraErrorKind};

/// Current envelope version. Bump when the envelope shape changes;
/// `parse` rejects anything newer than it knows.
pub const PAYLOAD_VERSION: u16 = 1;

/// Pre-escrow balances of both players, captured exactly once on acceptance.
/// Used after payout to compute level-change deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpBaseline {
    pub player_a: i64,
    pub player_b: i64,
}

/// The payload envelope stored alongside the structured duel fields.
///
/// `game` is owned by the configured game engine; the rest of the crate
/// treats it as an opaque JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelPayload {
    pub version: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp_baseline: Option<XpBaseline>,
    #[serde(default)]
    pub game: Value,
}

impl DuelPayload {
    pub fn new() -> Self {
        Self {
            version: PAYLOAD_VERSION,
            xp_baseline: None,
            game: Value::Null,
        }
    }

    /// Parse the stored blob. Fails with a payload infra error on malformed
    /// JSON or an envelope version this build does not understand.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let payload: DuelPayload = serde_json::from_str(raw).map_err(|e| {
            DomainError::infra(InfraErrorKind::Payload, format!("Malformed payload: {e}"))
        })?;
        if payload.version > PAYLOAD_VERSION {
            return Err(DomainError::infra(
                InfraErrorKind::Payload,
                format!("Unsupported payload version {}", payload.version),
            ));
        }
        Ok(payload)
    }

    /// Serialize for storage. The output is what the next CAS write will
    /// compare against.
    pub fn to_stored(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|e| {
            DomainError::infra(
                InfraErrorKind::Payload,
                format!("Payload serialization failed: {e}"),
            )
        })
    }
}

impl Default for DuelPayload {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_payload_round_trips() {
        let payload = DuelPayload::new();
        let raw = payload.to_stored().unwrap();
        assert_eq!(DuelPayload::parse(&raw).unwrap(), payload);
    }

    #[test]
    fn baseline_survives_round_trip() {
        let mut payload = DuelPayload::new();
        payload.xp_baseline = Some(XpBaseline {
            player_a: 500,
            player_b: 750,
        });
        let raw = payload.to_stored().unwrap();
        let parsed = DuelPayload::parse(&raw).unwrap();
        assert_eq!(parsed.xp_baseline.unwrap().player_b, 750);
    }

    #[test]
    fn newer_version_rejected() {
        let raw = format!("{{\"version\":{},\"game\":null}}", PAYLOAD_VERSION + 1);
        assert!(DuelPayload::parse(&raw).is_err());
    }

    #[test]
    fn malformed_blob_rejected() {
        assert!(DuelPayload::parse("not json").is_err());
    }
}
