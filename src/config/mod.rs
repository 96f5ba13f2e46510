//! Configuration layer: the raw settings mapping a host hands over, and its
//! conversion into a validated [`SenderConfig`].

mod password;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::Deserialize;
use serde::de::Error as DeError;

use crate::domain::{ApiKey, BaseUrl, Domain, SenderConfig, TrackingClicks, ValidationError};

pub use password::{DefaultPasswordResolver, PasswordResolver, SecretSpec};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const AWARE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting was present but rejected by its domain constructor.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The mapping is missing a required key, has an unknown key, or a value
    /// of the wrong type.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// `api-key` names an environment variable that is not set.
    #[error("environment variable {name} is not set")]
    MissingEnv { name: String },

    /// `api-key` names a file that could not be read.
    #[error("could not read secret file {}: {source}", .path.display())]
    SecretFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A custom [`PasswordResolver`] failed.
    #[error("password lookup failed: {0}")]
    Password(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// `deliverytime` is not a recognised date-time or timestamp.
    #[error("invalid deliverytime: {input:?}")]
    DeliveryTime { input: String },

    /// `deliverytime` has no offset and falls into a local DST gap.
    #[error("deliverytime {input:?} does not exist in the local timezone")]
    NonexistentLocalTime { input: String },
}

/// Settings exactly as they appear in a host's configuration mapping.
///
/// Keys are kebab-case (`base-url`, `api-key`, `tracking-clicks`, ...).
/// Unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawSenderConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    pub domain: String,
    pub api_key: SecretSpec,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deliverytime: Option<RawDeliveryTime>,
    #[serde(default)]
    pub dkim: Option<bool>,
    #[serde(default)]
    pub testmode: Option<bool>,
    #[serde(default)]
    pub tracking: Option<bool>,
    #[serde(default)]
    pub tracking_clicks: Option<RawTrackingClicks>,
    #[serde(default)]
    pub tracking_opens: Option<bool>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// `deliverytime` as written: a date-time string or a Unix timestamp
/// (integer or fractional seconds).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawDeliveryTime {
    Timestamp(i64),
    FractionalTimestamp(f64),
    Text(String),
}

impl RawDeliveryTime {
    /// Pin the value to a fixed offset. Strings without an offset are read
    /// as local time; timestamps are UTC.
    pub fn normalize(&self) -> Result<DateTime<FixedOffset>, ConfigError> {
        match self {
            Self::Timestamp(secs) => DateTime::from_timestamp(*secs, 0)
                .map(|time| time.fixed_offset())
                .ok_or_else(|| ConfigError::DeliveryTime {
                    input: secs.to_string(),
                }),
            Self::FractionalTimestamp(secs) => {
                fractional_timestamp(*secs).ok_or_else(|| ConfigError::DeliveryTime {
                    input: secs.to_string(),
                })
            }
            Self::Text(text) => parse_delivery_time(text.trim()),
        }
    }
}

fn fractional_timestamp(secs: f64) -> Option<DateTime<FixedOffset>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|time| time.fixed_offset())
}

fn parse_delivery_time(input: &str) -> Result<DateTime<FixedOffset>, ConfigError> {
    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(time);
    }
    for format in AWARE_FORMATS {
        if let Ok(time) = DateTime::parse_from_str(input, format) {
            return Ok(time);
        }
    }
    if let Ok(time) = DateTime::parse_from_rfc2822(input) {
        return Ok(time);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| ConfigError::DeliveryTime {
            input: input.to_owned(),
        })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|time| time.fixed_offset())
        .ok_or_else(|| ConfigError::NonexistentLocalTime {
            input: input.to_owned(),
        })
}

/// `tracking-clicks` as written: `false`, `true` or `"htmlonly"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTrackingClicks(pub TrackingClicks);

impl<'de> Deserialize<'de> for RawTrackingClicks {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Mode(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(flag) => Ok(Self(TrackingClicks::from(flag))),
            Repr::Mode(mode) if mode == "htmlonly" => Ok(Self(TrackingClicks::HtmlOnly)),
            Repr::Mode(mode) => Err(D::Error::custom(format!(
                "expected tracking-clicks to be true, false or \"htmlonly\", got {mode:?}"
            ))),
        }
    }
}

impl RawSenderConfig {
    /// Validate every field and resolve the API key.
    ///
    /// The key is looked up with `host` = the base URL's host and
    /// `username` = the domain.
    pub fn resolve(
        self,
        configpath: Option<&Path>,
        resolver: &dyn PasswordResolver,
    ) -> Result<SenderConfig, ConfigError> {
        let base_url = match self.base_url.as_deref() {
            Some(url) => BaseUrl::new(url)?,
            None => BaseUrl::default(),
        };
        let domain = Domain::new(self.domain)?;
        let secret = resolver.resolve(&self.api_key, base_url.host(), domain.as_str(), configpath)?;
        let api_key = ApiKey::new(secret)?;
        let deliverytime = self
            .deliverytime
            .as_ref()
            .map(RawDeliveryTime::normalize)
            .transpose()?;

        Ok(SenderConfig {
            base_url,
            domain,
            api_key,
            tags: self.tags,
            deliverytime,
            dkim: self.dkim,
            testmode: self.testmode,
            tracking: self.tracking,
            tracking_clicks: self.tracking_clicks.map(|clicks| clicks.0),
            tracking_opens: self.tracking_opens,
            headers: self.headers,
            variables: self.variables,
            configpath: configpath.map(Path::to_path_buf),
        })
    }
}

/// Build a [`SenderConfig`] from a JSON-like settings mapping, resolving the
/// API key with [`DefaultPasswordResolver`].
pub fn from_value(
    value: serde_json::Value,
    configpath: Option<&Path>,
) -> Result<SenderConfig, ConfigError> {
    from_value_with(value, configpath, &DefaultPasswordResolver)
}

/// Like [`from_value`], with a caller-supplied [`PasswordResolver`].
pub fn from_value_with(
    value: serde_json::Value,
    configpath: Option<&Path>,
    resolver: &dyn PasswordResolver,
) -> Result<SenderConfig, ConfigError> {
    let raw: RawSenderConfig = serde_json::from_value(value)?;
    raw.resolve(configpath, resolver)
}
