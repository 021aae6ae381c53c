//! Broadcast hub
//!
//! The hub is a single task that owns the set of open connections. Socket
//! handlers talk to it through [`RelayHub`], a cloneable handle that sends
//! commands over a channel. Commands are applied one at a time, so a
//! fan-out always sees a stable membership and join/leave never interleave
//! with it.
//!
//! Delivery is best effort: each connection has an unbounded outbound queue,
//! and a connection whose queue is gone when its turn comes is skipped and
//! pruned.

use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use crate::metrics;
use crate::utils::error::RelayError;

/// Identifier of one relay connection
pub type ConnectionId = Uuid;

/// A relayed message, forwarded without modification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lifecycle of a relay connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgrade requested, not yet registered with the hub
    Connecting,
    /// Registered; receives broadcasts
    Open,
    /// Gone; never receives again
    Closed,
}

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Recipients the frame was queued for
    pub delivered: usize,
    /// Recipients found closed at send time
    pub dropped: usize,
}

enum HubCommand {
    Join {
        id: ConnectionId,
        outbound: mpsc::UnboundedSender<Frame>,
    },
    Leave {
        id: ConnectionId,
    },
    Broadcast {
        from: ConnectionId,
        frame: Frame,
        done: Option<oneshot::Sender<FanOut>>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

struct Peer {
    outbound: mpsc::UnboundedSender<Frame>,
    state: ConnectionState,
}

/// Handle to the hub task
#[derive(Clone)]
pub struct RelayHub {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl RelayHub {
    /// Spawn the hub task on the current runtime
    pub fn spawn() -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        tokio::spawn(run_hub(inbox));
        Self { commands }
    }

    /// Register a new open connection
    ///
    /// Returns the connection id and the queue of frames to write to it.
    pub fn join(&self) -> Result<(ConnectionId, mpsc::UnboundedReceiver<Frame>), RelayError> {
        let id = Uuid::new_v4();
        let (outbound, queue) = mpsc::unbounded_channel();

        self.send(HubCommand::Join { id, outbound })?;
        Ok((id, queue))
    }

    /// Remove a connection; unknown ids are ignored
    pub fn leave(&self, id: ConnectionId) {
        // The hub being gone means there is nothing left to leave.
        let _ = self.send(HubCommand::Leave { id });
    }

    /// Queue a frame for every open connection except `from`
    pub fn broadcast(&self, from: ConnectionId, frame: Frame) -> Result<(), RelayError> {
        self.send(HubCommand::Broadcast {
            from,
            frame,
            done: None,
        })
    }

    /// Broadcast and wait until the frame has been queued for every recipient
    pub async fn broadcast_and_wait(
        &self,
        from: ConnectionId,
        frame: Frame,
    ) -> Result<FanOut, RelayError> {
        let (done, result) = oneshot::channel();
        self.send(HubCommand::Broadcast {
            from,
            frame,
            done: Some(done),
        })?;
        result.await.map_err(|_| RelayError::HubStopped)
    }

    /// Number of open connections
    pub async fn connection_count(&self) -> Result<usize, RelayError> {
        let (reply, count) = oneshot::channel();
        self.send(HubCommand::Count { reply })?;
        count.await.map_err(|_| RelayError::HubStopped)
    }

    fn send(&self, command: HubCommand) -> Result<(), RelayError> {
        self.commands
            .send(command)
            .map_err(|_| RelayError::HubStopped)
    }
}

async fn run_hub(mut inbox: mpsc::UnboundedReceiver<HubCommand>) {
    let mut peers: HashMap<ConnectionId, Peer> = HashMap::new();

    while let Some(command) = inbox.recv().await {
        match command {
            HubCommand::Join { id, outbound } => {
                peers.insert(
                    id,
                    Peer {
                        outbound,
                        state: ConnectionState::Open,
                    },
                );
                info!(connection = %id, open = peers.len(), "Client connected");
                metrics::record_relay_connection();
                metrics::update_relay_connections(peers.len());
            }
            HubCommand::Leave { id } => {
                if peers.remove(&id).is_some() {
                    info!(connection = %id, open = peers.len(), "Client disconnected");
                    metrics::update_relay_connections(peers.len());
                }
            }
            HubCommand::Broadcast { from, frame, done } => {
                let fan_out = fan_out(&mut peers, from, &frame);
                debug!(
                    connection = %from,
                    bytes = frame.len(),
                    delivered = fan_out.delivered,
                    dropped = fan_out.dropped,
                    "Broadcast relayed"
                );
                metrics::record_broadcast(fan_out.delivered, fan_out.dropped);
                metrics::update_relay_connections(peers.len());
                if let Some(done) = done {
                    let _ = done.send(fan_out);
                }
            }
            HubCommand::Count { reply } => {
                let _ = reply.send(peers.len());
            }
        }
    }

    debug!("Relay hub stopped");
}

/// Queue `frame` for every open peer other than `from`
///
/// A peer whose queue has been dropped is marked closed, skipped and
/// removed once the pass is over.
fn fan_out(peers: &mut HashMap<ConnectionId, Peer>, from: ConnectionId, frame: &Frame) -> FanOut {
    let mut result = FanOut::default();

    for (id, peer) in peers.iter_mut() {
        if *id == from || peer.state != ConnectionState::Open {
            continue;
        }

        if peer.outbound.send(frame.clone()).is_ok() {
            result.delivered += 1;
        } else {
            peer.state = ConnectionState::Closed;
            result.dropped += 1;
        }
    }

    peers.retain(|_, peer| peer.state == ConnectionState::Open);
    result
}
