//! Error types for the runtime

use thiserror::Error;

/// Errors surfaced by the renderer and application handle
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A selector mount target matched nothing in the host
    #[error("mount target not found: {0}")]
    MountTargetNotFound(String),

    /// `mount` was called on an application that is already mounted
    #[error("application is already mounted")]
    AlreadyMounted,

    /// `unmount` was called on an application that is not mounted
    #[error("application is not mounted")]
    NotMounted,

    /// Template compilation failed
    #[error("failed to compile template for component `{component}`: {source}")]
    Compile {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
