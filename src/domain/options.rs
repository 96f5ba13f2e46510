use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

use crate::domain::value::{ApiKey, BaseUrl, Domain};

/// Mailgun click tracking mode (`o:tracking-clicks`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingClicks {
    Off,
    On,
    /// Rewrite links in the HTML part only.
    HtmlOnly,
}

impl From<bool> for TrackingClicks {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Values Mailgun accepts as `yes`/`no` style option flags.
pub trait YesNo {
    fn yesno(&self) -> &'static str;
}

impl YesNo for bool {
    fn yesno(&self) -> &'static str {
        if *self { "yes" } else { "no" }
    }
}

impl YesNo for TrackingClicks {
    fn yesno(&self) -> &'static str {
        match self {
            Self::Off => false.yesno(),
            Self::On => true.yesno(),
            Self::HtmlOnly => "htmlonly",
        }
    }
}

/// Encode an option flag the way the Mailgun API expects it.
pub fn yesno<T: YesNo>(flag: T) -> &'static str {
    flag.yesno()
}

/// Format a delivery time as an RFC 5322 date (`Mon, 08 Mar 2021 10:36:31 -0500`).
pub fn format_delivery_time(time: &DateTime<FixedOffset>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// Validated settings of a [`MailgunSender`](crate::MailgunSender).
///
/// Optional fields left as `None` (or empty collections) are not sent to
/// Mailgun at all, so the account/domain defaults apply.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderConfig {
    pub base_url: BaseUrl,
    pub domain: Domain,
    pub api_key: ApiKey,
    pub tags: Vec<String>,
    pub deliverytime: Option<DateTime<FixedOffset>>,
    pub dkim: Option<bool>,
    pub testmode: Option<bool>,
    pub tracking: Option<bool>,
    pub tracking_clicks: Option<TrackingClicks>,
    pub tracking_opens: Option<bool>,
    /// Extra MIME headers, sent as `h:{name}`.
    pub headers: BTreeMap<String, String>,
    /// Custom variables, sent as `v:{name}`.
    pub variables: BTreeMap<String, String>,
    /// Where the configuration was loaded from. Diagnostics only.
    pub configpath: Option<PathBuf>,
}

impl SenderConfig {
    /// Config for `domain` against the default API endpoint, with every
    /// optional setting unset.
    pub fn new(domain: Domain, api_key: ApiKey) -> Self {
        Self {
            base_url: BaseUrl::default(),
            domain,
            api_key,
            tags: Vec::new(),
            deliverytime: None,
            dkim: None,
            testmode: None,
            tracking: None,
            tracking_clicks: None,
            tracking_opens: None,
            headers: BTreeMap::new(),
            variables: BTreeMap::new(),
            configpath: None,
        }
    }
}
