use thiserror::Error;

/// Errors raised at the input boundaries of the pipeline.
///
/// The pipeline stages themselves never fail: bad dates, missing fields, and
/// empty inputs degrade to sentinels or zero counts. Only user-supplied
/// selectors (columns, categories, formats), configuration, network, and the
/// snapshot cache can produce an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown column '{0}'. Use a canonical field such as stateCode, city, owner.name, validUntilDate, lanes.0.nominalSpeed")]
    UnknownColumn(String),

    #[error("unknown category '{0}'. Use: state, city, type, result, owner")]
    UnknownCategory(String),

    #[error("invalid date '{0}', expected DD/MM/YYYY or YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unknown {kind} '{value}'. Use: {expected}")]
    UnknownOption {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid records payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config {path}: {message}")]
    Config { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("fetch {state}: {message}")]
    Fetch { state: String, message: String },

    #[error("cache: {0}")]
    Cache(String),

    #[error("export: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, Error>;
