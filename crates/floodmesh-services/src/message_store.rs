use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use floodmesh_core::Packet;

/// One application message as delivered to this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedMessage {
    pub origin: String,
    pub timestamp: String,
    /// Lossy UTF-8 rendering of the payload.
    pub text: String,
    pub received_at_ms: u64,
}

impl ReceivedMessage {
    pub fn from_packet(packet: &Packet) -> Self {
        Self {
            origin: packet.origin.clone(),
            timestamp: packet.timestamp.clone(),
            text: String::from_utf8_lossy(&packet.payload).into_owned(),
            received_at_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// In-memory inbox of received messages
#[derive(Clone, Default)]
pub struct MessageStore {
    /// Messages per origin GID, in arrival order
    messages: Arc<DashMap<String, Vec<ReceivedMessage>>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(DashMap::new()),
        }
    }

    /// Add a message
    pub fn add(&self, message: ReceivedMessage) {
        self.messages
            .entry(message.origin.clone())
            .or_default()
            .push(message);
    }

    /// All messages from one origin
    pub fn get(&self, origin: &str) -> Vec<ReceivedMessage> {
        self.messages
            .get(origin)
            .map(|msgs| msgs.clone())
            .unwrap_or_default()
    }

    /// Every message, oldest first
    pub fn all(&self) -> Vec<ReceivedMessage> {
        let mut all: Vec<ReceivedMessage> = self
            .messages
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|m| m.received_at_ms);
        all
    }

    /// Count messages from one origin
    pub fn count(&self, origin: &str) -> usize {
        self.messages
            .get(origin)
            .map(|msgs| msgs.len())
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.messages.iter().map(|e| e.value().len()).sum()
    }

    /// Clear all messages
    pub fn clear(&self) {
        self.messages.clear();
    }
}
