//! Client layer: session lifecycle, the HTTP seam, and the send operation.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigError;
use crate::domain::{ApiKey, Message, MessageError, MessageId, SenderConfig, ValidationError};
use crate::transport::{MESSAGE_FILENAME, MESSAGE_PART, MimeForm};

const API_USERNAME: &str = "api";
const NOT_OPEN: &str = "MailgunSender is not open";
const NO_SUBJECT: &str = "<NO SUBJECT>";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    body: String,
}

trait HttpTransport: Send + Sync {
    fn post_multipart<'a>(
        &'a self,
        url: &'a str,
        form: MimeForm,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>>;
}

/// Opens transports bound to a set of basic-auth credentials.
trait Connector: Send + Sync {
    fn connect(&self, api_key: &ApiKey) -> Result<Box<dyn HttpTransport>, BoxError>;
}

#[derive(Debug, Clone)]
struct ReqwestTransport {
    client: reqwest::Client,
    api_key: ApiKey,
}

impl HttpTransport for ReqwestTransport {
    fn post_multipart<'a>(
        &'a self,
        url: &'a str,
        form: MimeForm,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
        Box::pin(async move {
            let mut multipart = reqwest::multipart::Form::new();
            for (name, value) in form.fields {
                multipart = multipart.text(name, value);
            }
            let part = reqwest::multipart::Part::bytes(form.message).file_name(MESSAGE_FILENAME);
            multipart = multipart.part(MESSAGE_PART, part);

            let response = self
                .client
                .post(url)
                .basic_auth(API_USERNAME, Some(self.api_key.expose()))
                .multipart(multipart)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Debug, Clone, Default)]
struct ReqwestConnector {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl Connector for ReqwestConnector {
    fn connect(&self, api_key: &ApiKey) -> Result<Box<dyn HttpTransport>, BoxError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent.as_deref() {
            builder = builder.user_agent(user_agent);
        }
        Ok(Box::new(ReqwestTransport {
            client: builder.build()?,
            api_key: api_key.clone(),
        }))
    }
}

/// One open connection pool, authenticated as `api:{api_key}`.
struct Session {
    transport: Box<dyn HttpTransport>,
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`MailgunSender`].
pub enum MailgunError {
    /// The sender is not in the state the operation needs (e.g. `close()`
    /// without a session).
    #[error("{0}")]
    InvalidState(&'static str),

    /// Settings could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The message headers or address lists could not be parsed.
    #[error("invalid message: {0}")]
    Message(#[from] MessageError),

    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Non-successful HTTP status code returned by Mailgun.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// Response body did not carry a message id.
    #[error("parse error: {0}")]
    Parse(#[source] BoxError),

    /// One of the domain constructors rejected an invalid value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone)]
/// Builder for [`MailgunSender`].
///
/// Use this when you need a request timeout or a custom user-agent.
pub struct MailgunSenderBuilder {
    config: SenderConfig,
    connector: ReqwestConnector,
}

impl MailgunSenderBuilder {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            connector: ReqwestConnector::default(),
        }
    }

    /// Set an HTTP client timeout applied to the entire request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.connector.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.connector.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> MailgunSender {
        MailgunSender {
            config: self.config,
            connector: Arc::new(self.connector),
            session: None,
        }
    }
}

/// Sends messages through Mailgun's `messages.mime` endpoint.
///
/// A sender is either closed or holds one open session (a pooled HTTP
/// client). [`send`](Self::send) works in both states: when closed it opens a
/// session for the duration of the call only.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), mailgun_sender::MailgunError> {
/// use mailgun_sender::{ApiKey, Domain, MailgunSender, Message, SenderConfig};
///
/// let config = SenderConfig::new(Domain::new("mg.example.com")?, ApiKey::new("key-...")?);
/// let mut sender = MailgunSender::new(config);
/// let msg = Message::parse("To: you@example.com\r\nSubject: hi\r\n\r\nhello\r\n")?;
/// let id = sender.send(&msg).await?;
/// println!("queued as {id}");
/// # Ok(())
/// # }
/// ```
pub struct MailgunSender {
    config: SenderConfig,
    connector: Arc<dyn Connector>,
    session: Option<Session>,
}

impl MailgunSender {
    pub fn new(config: SenderConfig) -> Self {
        MailgunSenderBuilder::new(config).build()
    }

    /// Load settings from a host configuration mapping (see
    /// [`config::from_value`](crate::config::from_value)) and build a sender.
    pub fn from_config_value(
        value: serde_json::Value,
        configpath: Option<&Path>,
    ) -> Result<Self, MailgunError> {
        Ok(Self::new(crate::config::from_value(value, configpath)?))
    }

    /// Start building a sender with custom HTTP settings.
    pub fn builder(config: SenderConfig) -> MailgunSenderBuilder {
        MailgunSenderBuilder::new(config)
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session. An already open session is replaced.
    pub fn open(&mut self) -> Result<(), MailgunError> {
        let transport = self
            .connector
            .connect(&self.config.api_key)
            .map_err(MailgunError::Transport)?;
        self.session = Some(Session { transport });
        tracing::debug!(domain = %self.config.domain, "opened Mailgun session");
        Ok(())
    }

    /// Close the open session.
    ///
    /// Errors with [`MailgunError::InvalidState`] when no session is open.
    pub fn close(&mut self) -> Result<(), MailgunError> {
        if self.session.take().is_none() {
            return Err(MailgunError::InvalidState(NOT_OPEN));
        }
        tracing::debug!(domain = %self.config.domain, "closed Mailgun session");
        Ok(())
    }

    /// Borrow the sender with a session guaranteed to be open.
    ///
    /// If the sender was closed, the guard opens a session now and closes it
    /// again when dropped; a session opened by the caller is left alone.
    pub fn scoped(&mut self) -> Result<SessionGuard<'_>, MailgunError> {
        let opened = !self.is_open();
        if opened {
            self.open()?;
        }
        Ok(SessionGuard {
            sender: self,
            opened,
        })
    }

    /// Send `message` and return the id Mailgun assigned to it.
    pub async fn send(&mut self, message: &Message) -> Result<MessageId, MailgunError> {
        self.scoped()?.send(message).await
    }
}

impl fmt::Debug for MailgunSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunSender")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

/// A [`MailgunSender`] with an open session, from [`MailgunSender::scoped`].
pub struct SessionGuard<'a> {
    sender: &'a mut MailgunSender,
    opened: bool,
}

impl SessionGuard<'_> {
    /// Send `message` over the guarded session.
    ///
    /// Errors:
    /// - [`MailgunError::Message`] for unparsable address headers,
    /// - [`MailgunError::Transport`] for network failures,
    /// - [`MailgunError::HttpStatus`] for non-2xx HTTP responses,
    /// - [`MailgunError::Parse`] when the response has no string `id`.
    pub async fn send(&mut self, message: &Message) -> Result<MessageId, MailgunError> {
        let subject = message.subject().unwrap_or(NO_SUBJECT);
        tracing::info!("Sending e-mail {subject:?} via Mailgun");

        let config = &self.sender.config;
        let form = crate::transport::encode_messages_mime_form(config, message)?;
        let url = config.base_url.messages_mime_endpoint(&config.domain);
        let session = self
            .sender
            .session
            .as_ref()
            .ok_or(MailgunError::InvalidState(NOT_OPEN))?;

        tracing::debug!(%url, fields = form.fields.len(), "posting message");
        let response = session
            .transport
            .post_multipart(&url, form)
            .await
            .map_err(MailgunError::Transport)?;

        if !(200..=299).contains(&response.status) {
            let body = if response.body.trim().is_empty() {
                None
            } else {
                Some(response.body)
            };
            return Err(MailgunError::HttpStatus {
                status: response.status,
                body,
            });
        }

        crate::transport::decode_messages_mime_json_response(&response.body)
            .map_err(|err| MailgunError::Parse(Box::new(err)))
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.opened && self.sender.session.take().is_some() {
            tracing::debug!(domain = %self.sender.config.domain, "closed scoped Mailgun session");
        }
    }
}
