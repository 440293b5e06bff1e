use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by the installment engine and its adapters.
///
/// The first five variants form the domain taxonomy callers are expected to
/// match on; the rest wrap infrastructure failures.
#[derive(Error, Diagnostic, Debug)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    #[diagnostic(code(cuotas::not_found))]
    NotFound { entity: &'static str, id: String },

    #[error("registration {registration_id} already has an active payment for installment {installment}")]
    #[diagnostic(code(cuotas::duplicate_payment))]
    DuplicatePayment {
        registration_id: u64,
        installment: u32,
    },

    #[error("invalid transition: {0}")]
    #[diagnostic(code(cuotas::invalid_transition))]
    InvalidTransition(String),

    #[error("validation error: {0}")]
    #[diagnostic(code(cuotas::validation))]
    ValidationError(String),

    #[error("{entity} {id} was modified concurrently")]
    #[diagnostic(
        code(cuotas::conflict),
        help("reload the record and apply the operation again")
    )]
    Conflict { entity: &'static str, id: String },

    #[error("CSV error: {0}")]
    #[diagnostic(code(cuotas::csv))]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(cuotas::io))]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    #[diagnostic(code(cuotas::serialization))]
    SerializationError(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    #[diagnostic(code(cuotas::config))]
    ConfigError(String),

    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    #[diagnostic(code(cuotas::storage))]
    StorageError(#[from] rocksdb::Error),

    #[error("internal error: {0}")]
    #[diagnostic(code(cuotas::internal))]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
