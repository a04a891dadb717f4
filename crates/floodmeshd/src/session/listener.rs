//! Inbound connection listener.
//!
//! Every accepted socket gets its own handshake task; the listener never
//! reads from a connection itself.

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::node::Node;

use super::handshake;

pub struct Listener {
    node: Node,
    listener: TcpListener,
    shutdown: broadcast::Receiver<()>,
}

impl Listener {
    pub fn new(node: Node, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Self {
        Self {
            node,
            listener,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("listener shutting down");
                    return;
                }

                result = self.listener.accept() => {
                    let (stream, remote) = match result {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    tracing::trace!(%remote, "connection accepted");
                    tokio::spawn(handshake::handle(self.node.clone(), stream, remote));
                }
            }
        }
    }
}
