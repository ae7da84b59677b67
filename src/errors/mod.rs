//! Error handling for the duel engine.

pub mod domain;

pub use domain::DomainError;
