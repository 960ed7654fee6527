use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// SQLite open/query failure.
    Sqlite(String),
    /// Record could not be encoded as JSON.
    Serialize(String),
    /// Stored body could not be decoded back into the record type.
    Deserialize { collection: String, key: String, message: String },
    /// Store file does not exist and the caller asked not to create it.
    NotFound(String),
    /// Filesystem error around the store file.
    Io(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(msg) => write!(f, "sqlite error: {msg}"),
            Self::Serialize(msg) => write!(f, "cannot encode record: {msg}"),
            Self::Deserialize { collection, key, message } => {
                write!(f, "collection '{collection}', key '{key}': cannot decode record: {message}")
            }
            Self::NotFound(path) => write!(f, "store file not found: {path}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e.to_string())
    }
}
