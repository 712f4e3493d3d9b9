//! Alertik relay -- from syslog datagrams to chat notifications.
//!
//! # Modules
//!
//! - [`receiver`]: UDP syslog receiver (queue producer, optional forwarding)
//! - [`queue`]: bounded SPSC event queue
//! - [`rule`]: rule table, substring/regex matching, mask templates
//! - [`notifier`]: Telegram / Slack / Teams / Discord back-ends
//! - [`limiter`]: global notification cooldown
//! - [`dispatch`]: queue consumer (cooldown, evaluation, sending)
//! - [`pipeline`]: [`AlertRelay`], the `Pipeline` implementation
//! - [`error`]: domain error type
//!
//! # Architecture
//!
//! ```text
//! UDP -> SyslogReceiver -> EventQueue -> Dispatcher -> NotifierSet -> HTTP
//!                                          |
//!                                RuleTable + RateLimiter
//! ```

pub mod dispatch;
pub mod error;
pub mod limiter;
pub mod notifier;
pub mod pipeline;
pub mod queue;
pub mod receiver;
pub mod rule;

// --- re-exports ---

// pipeline
pub use pipeline::{AlertRelay, AlertRelayBuilder};

// errors
pub use error::RelayError;

// components
pub use dispatch::{Dispatcher, RelayStats};
pub use limiter::{Clock, ManualClock, RateLimiter, SystemClock};
pub use notifier::{HttpTransport, Notifier, NotifierSet, ReqwestTransport};
pub use queue::EventQueue;
pub use receiver::{ReceiverStats, SyslogReceiver};
pub use rule::{Dispatch, Evaluation, RuleTable};
