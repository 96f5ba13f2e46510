use std::fmt;

use url::Url;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Mailgun sending domain (e.g. `mg.example.com`).
///
/// Invariant: non-empty after trimming.
pub struct Domain(String);

impl Domain {
    /// Configuration key for the domain (`domain`).
    pub const FIELD: &'static str = "domain";

    /// Create a validated [`Domain`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated domain.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Mailgun private API key.
///
/// Invariant: must not be empty. The value never appears in `Debug` output.
pub struct ApiKey(String);

impl ApiKey {
    /// Configuration key for the API key (`api-key`).
    pub const FIELD: &'static str = "api-key";

    /// Create a validated [`ApiKey`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Borrow the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(\"**********\")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Root URL of the Mailgun API.
///
/// Invariant: absolute `http`/`https` URL with a host. Stored without a
/// trailing slash.
pub struct BaseUrl {
    url: String,
    host: String,
}

impl BaseUrl {
    /// Configuration key for the base URL (`base-url`).
    pub const FIELD: &'static str = "base-url";

    /// Mailgun's US region endpoint.
    pub const DEFAULT: &'static str = "https://api.mailgun.net";

    /// Parse and validate a [`BaseUrl`].
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let input = value.as_ref().trim();
        if input.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let parsed = Url::parse(input).map_err(|err| ValidationError::InvalidUrl {
            input: input.to_owned(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme {
                scheme: parsed.scheme().to_owned(),
            });
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| ValidationError::MissingHost {
                input: input.to_owned(),
            })?
            .to_owned();
        Ok(Self {
            url: parsed.as_str().trim_end_matches('/').to_owned(),
            host,
        })
    }

    /// Borrow the URL, without a trailing slash.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Host component, used as the lookup key when resolving the API key.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `{base}/v3/{domain}/messages.mime`
    pub fn messages_mime_endpoint(&self, domain: &Domain) -> String {
        format!("{}/v3/{}/messages.mime", self.url, domain.as_str())
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self {
            url: Self::DEFAULT.to_owned(),
            host: "api.mailgun.net".to_owned(),
        }
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifier Mailgun assigns to an accepted message.
///
/// Mailgun reports ids as `<local@domain>`; the angle brackets are stripped.
pub struct MessageId(String);

impl MessageId {
    /// Build a [`MessageId`] from the raw `id` field of a Mailgun response.
    pub fn from_provider(raw: &str) -> Self {
        let raw = raw.strip_prefix('<').unwrap_or(raw);
        let raw = raw.strip_suffix('>').unwrap_or(raw);
        Self(raw.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
