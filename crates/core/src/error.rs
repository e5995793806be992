#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Project type is '{actual}', but it has to be '{expected}'")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("Malformed annotation: {0}")]
    MalformedAnnotation(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
