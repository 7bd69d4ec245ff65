pub mod backoff;
pub mod drain_ticker;
pub mod event_handler;
pub mod event_queue;
pub mod sendable_event;

pub use backoff::{retry_with_backoff, ExponentialBackoff};
pub use drain_ticker::DrainTicker;
pub use event_handler::{HandlerStats, TaskEventHandler};
pub use event_queue::{EnqueueOutcome, TaskEventQueue};
pub use sendable_event::{SendOutcome, SendableEvent};
