/// Errors that can occur across the Sediment workspace.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette` reports at the boundary.
///
/// # Examples
///
/// ```
/// use sediment_core::SedimentError;
///
/// let err = SedimentError::Workspace("path is not a directory".into());
/// assert!(err.to_string().contains("not a directory"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SedimentError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Source code parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// Workspace path rejected before analysis started.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// State database failure.
    #[error("database error: {0}")]
    Database(String),

    /// A full analysis is already running for this workspace.
    #[error("an analysis is already in progress for this workspace")]
    AnalysisInProgress,

    /// The run was cancelled before it finished; nothing was published.
    #[error("analysis cancelled")]
    Cancelled,

    /// A background worker task failed to complete.
    #[error("task error: {0}")]
    Task(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SedimentError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = SedimentError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn in_progress_error_has_fixed_message() {
        let err = SedimentError::AnalysisInProgress;
        assert!(err.to_string().contains("already in progress"));
    }
}
