use thiserror::Error;

#[derive(Error, Debug)]
pub enum FecError {
    #[error("Missing required FEC column: {0}")]
    MissingColumn(String),

    #[error("Empty FEC file: no header row found")]
    EmptyFile,

    #[error("CSV parse error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FecError>;
