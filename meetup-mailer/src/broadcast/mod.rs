//! Broadcast of one message to every extracted registrant.
//!
//! ```text
//! EmailSet → broadcast() → MailTransport::send (one per address) → BroadcastResult
//! ```

pub mod dispatcher;
pub mod transport;

pub use dispatcher::{broadcast, BroadcastOutcome, BroadcastResult, FailedDelivery};
pub use transport::{MailTransport, MailgunTransport};
