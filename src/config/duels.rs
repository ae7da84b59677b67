//! Runtime configuration for the duel engine.
//!
//! All values have production defaults and can be overridden through
//! `DUEL_*` environment variables.

use std::env;

use time::Duration;

use crate::errors::domain::{DomainError, InfraErrorKind};

/// Windows, retention periods and stake denominations for duel sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct DuelConfig {
    /// Expiry window set when a session is created in CONFIG.
    pub config_window: Duration,
    /// Expiry window set on the CONFIG -> INVITED transition.
    pub invite_window: Duration,
    /// Expiry window set on the INVITED -> ACTIVE transition.
    pub play_window: Duration,
    /// Retention for EXPIRED and CANCELLED sessions before physical delete.
    pub expired_retention: Duration,
    /// Retention for FINISHED sessions before physical delete.
    pub finished_retention: Duration,
    /// Allowed stake denominations, ascending.
    pub allowed_stakes: Vec<i32>,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            config_window: Duration::minutes(15),
            invite_window: Duration::minutes(5),
            play_window: Duration::minutes(10),
            expired_retention: Duration::days(1),
            finished_retention: Duration::days(7),
            allowed_stakes: vec![50, 100, 250, 500, 1000],
        }
    }
}

impl DuelConfig {
    /// Build a config from environment variables, falling back to defaults
    /// for anything unset.
    ///
    /// Durations are given in seconds (`DUEL_CONFIG_WINDOW_SECS`,
    /// `DUEL_INVITE_WINDOW_SECS`, `DUEL_PLAY_WINDOW_SECS`,
    /// `DUEL_EXPIRED_RETENTION_SECS`, `DUEL_FINISHED_RETENTION_SECS`),
    /// stakes as a comma-separated list (`DUEL_ALLOWED_STAKES`).
    pub fn from_env() -> Result<Self, DomainError> {
        let defaults = Self::default();

        let config = Self {
            config_window: duration_var("DUEL_CONFIG_WINDOW_SECS", defaults.config_window)?,
            invite_window: duration_var("DUEL_INVITE_WINDOW_SECS", defaults.invite_window)?,
            play_window: duration_var("DUEL_PLAY_WINDOW_SECS", defaults.play_window)?,
            expired_retention: duration_var(
                "DUEL_EXPIRED_RETENTION_SECS",
                defaults.expired_retention,
            )?,
            finished_retention: duration_var(
                "DUEL_FINISHED_RETENTION_SECS",
                defaults.finished_retention,
            )?,
            allowed_stakes: stakes_var("DUEL_ALLOWED_STAKES", defaults.allowed_stakes)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DomainError> {
        for (name, window) in [
            ("config_window", self.config_window),
            ("invite_window", self.invite_window),
            ("play_window", self.play_window),
            ("expired_retention", self.expired_retention),
            ("finished_retention", self.finished_retention),
        ] {
            if window <= Duration::ZERO {
                return Err(DomainError::infra(
                    InfraErrorKind::Other("Config".into()),
                    format!("{name} must be positive"),
                ));
            }
        }
        if self.allowed_stakes.is_empty() {
            return Err(DomainError::infra(
                InfraErrorKind::Other("Config".into()),
                "allowed_stakes must not be empty",
            ));
        }
        if self.allowed_stakes.iter().any(|s| *s <= 0) {
            return Err(DomainError::infra(
                InfraErrorKind::Other("Config".into()),
                "allowed_stakes must be positive",
            ));
        }
        Ok(())
    }
}

/// Read a duration (in whole seconds) from the environment.
fn duration_var(name: &str, default: Duration) -> Result<Duration, DomainError> {
    match env::var(name) {
        Ok(raw) => {
            let secs: i64 = raw.parse().map_err(|_| {
                DomainError::infra(
                    InfraErrorKind::Other("Config".into()),
                    format!("{name} must be an integer number of seconds, got '{raw}'"),
                )
            })?;
            Ok(Duration::seconds(secs))
        }
        Err(_) => Ok(default),
    }
}

/// Read a comma-separated stake list from the environment.
fn stakes_var(name: &str, default: Vec<i32>) -> Result<Vec<i32>, DomainError> {
    match env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(|part| {
                part.trim().parse::<i32>().map_err(|_| {
                    DomainError::infra(
                        InfraErrorKind::Other("Config".into()),
                        format!("{name} must be a comma-separated list of integers, got '{raw}'"),
                    )
                })
            })
            .collect(),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DuelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.allowed_stakes, vec![50, 100, 250, 500, 1000]);
    }

    #[test]
    fn empty_stakes_rejected() {
        let config = DuelConfig {
            allowed_stakes: vec![],
            ..DuelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_window_rejected() {
        let config = DuelConfig {
            play_window: Duration::ZERO,
            ..DuelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
