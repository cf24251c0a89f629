use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// An encoded message on its way to a producer handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub payload: Vec<u8>,
    pub key: Option<Vec<u8>>,
    pub properties: HashMap<String, String>,
    pub event_time: Option<DateTime<Utc>>,
}

impl OutboundMessage {
    pub fn new(payload: Vec<u8>) -> Self {
        OutboundMessage {
            payload,
            ..Default::default()
        }
    }

    pub fn key(mut self, key: Vec<u8>) -> Self {
        self.key = Some(key);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn event_time(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = Some(event_time);
        self
    }
}

/// An encoded message received from a consumer handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundMessage {
    pub destination: String,
    pub payload: Vec<u8>,
    pub key: Option<Vec<u8>>,
    pub properties: HashMap<String, String>,
    pub event_time: Option<DateTime<Utc>>,
}
