use std::path::PathBuf;

use vidstats_core::error::CoreError;

/// Failures raised by a [`ProjectSource`](crate::source::ProjectSource).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that abort a statistics run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Malformed annotation for video {video}: {reason}")]
    MalformedAnnotation { video: String, reason: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = SourceError::NotFound {
            entity: "project",
            id: "7".into(),
        };
        assert_eq!(err.to_string(), "Entity not found: project with id 7");
    }

    #[test]
    fn display_malformed() {
        let err = PipelineError::MalformedAnnotation {
            video: "clip.mp4".into(),
            reason: "unknown class 'horse'".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed annotation for video clip.mp4: unknown class 'horse'"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let err = SourceError::Io {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::other("boom"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/tmp/x"));
    }
}
