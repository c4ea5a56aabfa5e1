//! Error types for the reactive core

use thiserror::Error;

/// Errors raised by reactive handles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// A write was attempted on a computed value that has no setter
    #[error("computed value is read-only")]
    ReadonlyComputed,
}

/// Result type for reactive operations
pub type Result<T> = std::result::Result<T, ReactiveError>;
