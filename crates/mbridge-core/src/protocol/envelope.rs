//! Bridge envelope (one text frame per message).
//!
//! Encoded shape, with a fixed key set:
//! `{"type": <0|1|2|3>, "data": "<payload>", "channel": "<name>", "dtype": "<name>"}`
//!
//! Decoding goes through [`extract_field`], so it tolerates replies that are not
//! strictly our own encoding (named type tags, `data` sent as a nested object,
//! error text under `msg`).

use tracing::debug;

use super::field::{escape, extract_field};
use crate::error::{BridgeError, Result};

/// Envelope message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Publish,
    Request,
    Response,
    Error,
}

impl MessageType {
    /// Integer tag on the wire. Must match the bridge bit-for-bit.
    pub fn code(self) -> u8 {
        match self {
            MessageType::Publish => 0,
            MessageType::Request => 1,
            MessageType::Response => 2,
            MessageType::Error => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MessageType::Publish),
            1 => Some(MessageType::Request),
            2 => Some(MessageType::Response),
            3 => Some(MessageType::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Publish => "publish",
            MessageType::Request => "request",
            MessageType::Response => "response",
            MessageType::Error => "error",
        }
    }

    /// Parse a type token: an integer tag or a case-insensitive name.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Ok(code) = token.parse::<u8>() {
            return Self::from_code(code);
        }
        match token.to_ascii_lowercase().as_str() {
            "publish" => Some(MessageType::Publish),
            "request" => Some(MessageType::Request),
            "response" => Some(MessageType::Response),
            "error" => Some(MessageType::Error),
            _ => None,
        }
    }
}

/// Tagged message exchanged with the bridge. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Message type (field name is `type` on the wire).
    pub msg_type: MessageType,
    /// Logical topic, e.g. `MBOT_ODOMETRY`.
    pub channel: String,
    /// Payload type name; only meaningful for publishes.
    pub dtype: String,
    /// Payload fragment (`"key": value` pairs without braces), or error text.
    pub data: String,
}

impl Envelope {
    pub fn publish(
        channel: impl Into<String>,
        dtype: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            msg_type: MessageType::Publish,
            channel: channel.into(),
            dtype: dtype.into(),
            data: data.into(),
        }
    }

    /// Request for the latest value on `channel` (empty payload).
    pub fn request(channel: impl Into<String>) -> Self {
        Self {
            msg_type: MessageType::Request,
            channel: channel.into(),
            dtype: String::new(),
            data: String::new(),
        }
    }

    pub fn response(
        channel: impl Into<String>,
        dtype: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            msg_type: MessageType::Response,
            channel: channel.into(),
            dtype: dtype.into(),
            data: data.into(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            msg_type: MessageType::Error,
            channel: String::new(),
            dtype: String::new(),
            data: msg.into(),
        }
    }

    /// Serialize into one text frame.
    pub fn encode(&self) -> String {
        format!(
            "{{\"type\": {}, \"data\": \"{}\", \"channel\": \"{}\", \"dtype\": \"{}\"}}",
            self.msg_type.code(),
            escape(&self.data),
            escape(&self.channel),
            escape(&self.dtype),
        )
    }

    /// Decode one inbound text frame.
    ///
    /// Missing `data`/`channel`/`dtype` degrade to empty strings. A missing or
    /// unrecognized `type` is a protocol failure.
    pub fn decode(text: &str) -> Result<Self> {
        let token = extract_field(text, "type");
        let Some(msg_type) = MessageType::parse(&token) else {
            debug!(token = %token, "unrecognized envelope type");
            return Err(BridgeError::Protocol(if token.is_empty() {
                "envelope has no type".into()
            } else {
                format!("unrecognized envelope type: {token:?}")
            }));
        };

        let mut data = extract_field(text, "data");
        if msg_type == MessageType::Error && data.is_empty() {
            data = extract_field(text, "msg");
        }

        Ok(Self {
            msg_type,
            channel: extract_field(text, "channel"),
            dtype: extract_field(text, "dtype"),
            data,
        })
    }
}
