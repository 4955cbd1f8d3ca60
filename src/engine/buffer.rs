// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Data that travels across links.
//!
//! Payloads are opaque bytes to the framework; only elements interpret them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of media data. One buffer is one demand unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buffer {
    pub payload: Vec<u8>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Buffer {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Stream capabilities announced on a pad before (or between) buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caps {
    pub media_type: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Caps {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// In-band events sent along a link, ordered with the buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    EndOfStream,
    Custom(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_json_shape() {
        let buffer = Buffer::new(vec![1]).with_metadata("pts", json!(40));
        let value = serde_json::to_value(&buffer).unwrap();
        assert_eq!(value, json!({"payload": [1], "metadata": {"pts": 40}}));

        let back: Buffer = serde_json::from_value(json!({"payload": [1]})).unwrap();
        assert_eq!(back, Buffer::new(vec![1]));
    }
}
