//! Requests from the control surface to the running node.
//!
//! The HTTP API never touches the node directly. It pushes a command on an
//! mpsc channel and waits on the embedded oneshot for the result; the
//! daemon drains the channel.

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::peer::PeerSummary;

/// Result of broadcasting one application message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub origin: String,
    pub timestamp: String,
    /// Peers the message was handed to. Zero when this node is isolated.
    pub delivered_to: usize,
}

pub type Reply<T> = oneshot::Sender<Result<T, String>>;

pub enum ControlCommand {
    SendMessage { payload: Bytes, reply: Reply<SendReceipt> },
    EnterNetwork { address: String, reply: Reply<()> },
    Peers { reply: oneshot::Sender<Vec<PeerSummary>> },
}

pub type ControlSender = mpsc::Sender<ControlCommand>;
pub type ControlReceiver = mpsc::Receiver<ControlCommand>;

pub fn control_channel(capacity: usize) -> (ControlSender, ControlReceiver) {
    mpsc::channel(capacity)
}
