//! Polling loop draining the inbound slave queue.
//!
//! A single task takes messages off the queue in arrival order and hands each
//! to the router before taking the next one. A failed delivery is logged and
//! the loop carries on.

use std::sync::Arc;

use tracing::{error, info};

use super::channels::PollerChannels;
use super::router::MessageRouter;

pub struct Poller {
    router: Arc<MessageRouter>,
    channels: PollerChannels,
}

impl Poller {
    pub fn new(router: Arc<MessageRouter>, channels: PollerChannels) -> Self {
        Self { router, channels }
    }

    /// Run until shutdown is signalled or every slave sender is gone.
    pub async fn run(self) {
        let Poller {
            router,
            channels:
                PollerChannels {
                    mut inbound_rx,
                    mut shutdown_rx,
                },
        } = self;

        info!("Polling loop started");
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Polling loop shutting down");
                        break;
                    }
                }

                msg = inbound_rx.recv() => {
                    match msg {
                        Some(msg) => {
                            if let Err(e) = router.deliver(&msg).await {
                                error!("Failed to deliver message from {}: {}", msg.origin(), e);
                            }
                        }
                        None => {
                            info!("Inbound queue closed");
                            break;
                        }
                    }
                }
            }
        }
    }
}
