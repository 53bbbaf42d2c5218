/// Core error type.
///
/// Adapter crates map their specific failures into this type so the binary
/// can report every fatal startup error the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("tdlib error: {0}")]
    Td(String),

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse { expected: &'static str, got: String },

    #[error("session is closed")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
