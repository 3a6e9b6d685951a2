//! Error taxonomy for the fetch and channel boundaries.
//!
//! None of these reach the render path: the loader turns a [`FetchError`]
//! into `REQUEST_ERROR`, the channel turns a [`ChannelError`] into
//! `CHANNEL_DISCONNECTED`.

/// Item or page payload that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("item is missing identity attribute `{0}`")]
    MissingIdentity(String),

    #[error("item is missing rank attribute `{attr}`")]
    MissingRank { attr: String },

    #[error("rank `{value}` is not a number")]
    InvalidRank { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} from {path}")]
    Http { status: u16, path: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed page: {0}")]
    Malformed(#[from] DecodeError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("socket error: {0}")]
    Socket(String),

    #[error("join of `{topic}` refused: {reason}")]
    JoinRefused { topic: String, reason: String },

    #[error("topic `{0}` errored")]
    TopicError(String),

    #[error("topic `{0}` closed")]
    TopicClosed(String),

    #[error("socket closed")]
    Closed,

    #[error("bad frame: {0}")]
    Frame(String),
}

#[cfg(feature = "native")]
impl From<tungstenite::Error> for ChannelError {
    fn from(e: tungstenite::Error) -> Self {
        ChannelError::Socket(e.to_string())
    }
}
