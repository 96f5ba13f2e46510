//! Domain layer: strong types with validation and invariants (no I/O).

mod message;
mod options;
mod validation;
mod value;

pub use message::{Message, MessageError, extract_recipients};
pub use options::{SenderConfig, TrackingClicks, YesNo, format_delivery_time, yesno};
pub use validation::ValidationError;
pub use value::{ApiKey, BaseUrl, Domain, MessageId};
