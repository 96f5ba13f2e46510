//! Send e-mail through the Mailgun HTTP API instead of SMTP.
//!
//! The crate follows a layered design: a domain layer of strong types (no
//! I/O), a config layer turning a host's settings mapping into a validated
//! [`SenderConfig`], a transport layer for the `messages.mime` wire format,
//! and a small client layer owning the HTTP session.
//!
//! ```rust,no_run
//! use mailgun_sender::{MailgunSender, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailgun_sender::MailgunError> {
//!     let mut sender = MailgunSender::from_config_value(
//!         serde_json::json!({
//!             "domain": "mg.example.com",
//!             "api-key": {"env": "MAILGUN_API_KEY"},
//!             "tags": ["newsletter"],
//!             "tracking-clicks": "htmlonly",
//!         }),
//!         None,
//!     )?;
//!     let msg = Message::parse(
//!         "From: me@mg.example.com\r\nTo: you@example.com\r\nSubject: hi\r\n\r\nhello\r\n",
//!     )?;
//!     let id = sender.send(&msg).await?;
//!     println!("queued as {id}");
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod domain;
mod transport;

pub use client::{MailgunError, MailgunSender, MailgunSenderBuilder, SessionGuard};
pub use config::{ConfigError, DefaultPasswordResolver, PasswordResolver, SecretSpec};
pub use domain::{
    ApiKey, BaseUrl, Domain, Message, MessageError, MessageId, SenderConfig, TrackingClicks,
    ValidationError, YesNo, extract_recipients, yesno,
};
