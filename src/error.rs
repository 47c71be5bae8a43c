use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("registry error: {0}")]
    Redb(#[from] redb::Error),

    #[error("registry database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("registry storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("registry transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("registry table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("registry commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty query")]
    EmptyQuery,

    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    #[error("search backend unreachable: all {} queried partition(s) failed", .failed.len())]
    BackendUnreachable { failed: Vec<String> },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}
