use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("frame is not a json object")]
    NotAnObject,
    #[error("frame has no string \"type\" field")]
    MissingType,
    #[error("unknown server event \"{0}\"")]
    UnknownEvent(String),
    #[error("invalid payload for \"{event}\": {source}")]
    InvalidPayload {
        event: String,
        source: serde_json::Error,
    },
}
