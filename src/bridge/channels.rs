//! Bridge channel management.
//!
//! Groups the inbound slave queue and the shutdown signal so they can be
//! handed out to the tasks that need them.

use tokio::sync::{mpsc, watch};

use crate::common::messages::SlaveMessage;

/// Channels for slave backends.
pub struct SlaveChannels {
    /// Sender for Slave -> Master messages (cloned into every backend).
    pub inbound_tx: mpsc::UnboundedSender<SlaveMessage>,
}

/// Channels for the polling loop.
pub struct PollerChannels {
    /// Receiver for Slave -> Master messages.
    pub inbound_rx: mpsc::UnboundedReceiver<SlaveMessage>,
    /// Receiver for the shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Control channels for shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Bundle of all channels created by the bridge.
pub struct ChannelBundle {
    pub slaves: SlaveChannels,
    pub poller: PollerChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    /// Create a new set of bridge channels.
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            slaves: SlaveChannels { inbound_tx },
            poller: PollerChannels {
                inbound_rx,
                shutdown_rx,
            },
            control: ControlChannels { shutdown_tx },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
