use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("table already exists: {0}")]
    TableExists(String),

    #[error("index already exists: {0}")]
    IndexExists(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("corruption: {0}")]
    Corrupt(String),

    #[error("page overflow: {0}")]
    PageOverflow(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
