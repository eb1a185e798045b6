use std::fmt;

/// The crate-wide error type. Both variants are startup-level: bad CLI/config input, or a beacon
/// node client that can't even be constructed (malformed URL). Once the service is running,
/// per-request failures are logged and retried or skipped rather than surfaced as `Error` —
/// see `node_pool` and `request`.
#[derive(Debug)]
pub enum Error {
    Config(String),
    Http(eth2::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Http(e) => write!(f, "http error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<eth2::Error> for Error {
    fn from(e: eth2::Error) -> Self {
        Error::Http(e)
    }
}
