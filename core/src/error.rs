use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing config file: {path}")]
    ConfigNotFound { path: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required table '{table}' for run '{run_id}'")]
    MissingTable { table: &'static str, run_id: String },

    #[error("{table} references unknown key '{key}'")]
    DanglingReference { table: &'static str, key: String },

    #[error("Unknown {kind} value '{value}'")]
    UnknownCategory { kind: &'static str, value: String },

    #[error("Customer ID must be an integer, got '{input}'")]
    InvalidCustomerId { input: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
