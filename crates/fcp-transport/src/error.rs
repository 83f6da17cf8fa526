use thiserror::Error;

/// Failures from the raw line/chunk transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("expected a '{expected}' line, got {got:?}")]
    UnexpectedLine {
        expected: &'static str,
        got: String,
    },

    #[error("malformed field line (expected 'Field=Value'): {0:?}")]
    MalformedField(String),

    #[error("field {field} had a non-hex value: {value:?}")]
    BadHexField { field: &'static str, value: String },
}
