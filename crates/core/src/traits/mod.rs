//! Capability traits for the qualification engine
//!
//! The engine only talks to the outside world through these seams:
//!
//! ```text
//! Storage:
//!   - LeadStore: lead records, looked up by id or phone
//!   - SessionStore: versioned conversation sessions
//!   - MessageStore: append-only message log
//!
//! Messaging:
//!   - MessageTransport: send(address, text) -> receipt
//!
//! Language models:
//!   - CompletionModel: complete(prompt, history) -> text + optional structure
//!
//! Notifications:
//!   - NotificationChannel: deliver(payload) -> delivered | skipped
//! ```

mod completion;
mod notification;
mod storage;
mod transport;

pub use completion::{Completion, CompletionModel};
pub use notification::{ChannelOutcome, NotificationChannel};
pub use storage::{LeadStore, MessageStore, SessionStore};
pub use transport::{DeliveryReceipt, InboundMessage, MessageTransport};
