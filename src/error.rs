use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Table '{0}' does not exist")]
    TableNotExist(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),

    #[error("Entity '{0}' already exists")]
    EntityAlreadyExists(String),

    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Properties need value: {0}")]
    PropertiesNeedValue(String),

    #[error("Invalid query condition: {0}")]
    QueryConditionInvalid(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Transaction overlap: {0}")]
    TransactionOverlap(String),

    #[error("Store is closed")]
    StoreClosed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
