//! Relay core between the master chat and the slave backends.
//!
//! ## Module Structure
//!
//! - `channels`: Inbound queue and shutdown channels
//! - `session`: In-flight link dialogs (`SessionTracker`)
//! - `payload`: Callback payload and start parameter encoding
//! - `formatter`: Display names, glyphs and message formats
//! - `linking`: Link dialog state machine (`ChatLinker`)
//! - `router`: Message routing in both directions (`MessageRouter`)
//! - `poller`: Polling loop over the inbound queue (`Poller`)

pub mod channels;
pub mod formatter;
pub mod linking;
pub mod payload;
pub mod poller;
pub mod router;
pub mod session;

#[cfg(test)]
pub mod testing;

pub use channels::ChannelBundle;
pub use formatter::RelayFormatter;
pub use linking::ChatLinker;
pub use poller::Poller;
pub use router::MessageRouter;
pub use session::SessionTracker;
