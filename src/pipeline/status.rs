use serde::Serialize;
use std::fmt;

/// Outcome of handing one finished frame to the virtual camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    /// No device is bound.
    NoActiveDevice,
    /// A device is bound but no application is reading it yet.
    TransportNotReady,
    /// The transport rejected or failed to write the frame.
    SubmitFailed,
    /// The frame does not match the configured output geometry.
    SizeMismatch,
}

impl StatusCode {
    /// Human-readable message for the embedding layer.
    ///
    /// `Ok` maps to an empty string, which consumers read as "no error".
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "",
            Self::NoActiveDevice => "Virtual camera error: no active device.",
            Self::TransportNotReady => {
                "Virtual camera error: no application is reading the device yet."
            }
            Self::SubmitFailed => "Virtual camera error: failed to deliver frame.",
            Self::SizeMismatch => {
                "Virtual camera error: frame size does not match the device output size."
            }
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::NoActiveDevice => "no active device",
            Self::TransportNotReady => "transport not ready",
            Self::SubmitFailed => "submit failed",
            Self::SizeMismatch => "size mismatch",
        };
        f.write_str(name)
    }
}

/// A status transition delivered through a subscription channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub code: StatusCode,
    pub message: String,
}

impl From<StatusCode> for StatusEvent {
    fn from(code: StatusCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }
}
