use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use mailparse::{MailAddr, MailHeaderMap};

const ADDRESS_HEADERS: [&str; 3] = ["To", "Cc", "Bcc"];
const BCC: &str = "Bcc";

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The header section could not be parsed.
    #[error("malformed message headers: {0}")]
    Headers(#[from] mailparse::MailParseError),

    /// A `To`, `Cc` or `Bcc` header does not hold a valid address list.
    #[error("malformed {header} header: {source}")]
    Address {
        header: String,
        #[source]
        source: mailparse::MailParseError,
    },
}

/// An RFC 5322 e-mail message, kept as the raw bytes it was built from.
///
/// Headers are validated at construction; the bytes themselves are never
/// modified, except that [`Message::to_wire`] leaves out `Bcc`.
#[derive(Clone)]
pub struct Message {
    raw: Vec<u8>,
    header_len: usize,
    subject: Option<String>,
    has_bcc: bool,
}

impl Message {
    pub fn parse(raw: impl Into<Vec<u8>>) -> Result<Self, MessageError> {
        let raw = raw.into();
        let (headers, header_len) = mailparse::parse_headers(&raw)?;
        let subject = headers.get_first_value("Subject");
        let has_bcc = !headers.get_all_headers(BCC).is_empty();
        Ok(Self {
            raw,
            header_len,
            subject,
            has_bcc,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn has_bcc(&self) -> bool {
        self.has_bcc
    }

    /// Bytes to hand to the provider: the message with every `Bcc` header
    /// (and its folded continuation lines) removed.
    pub fn to_wire(&self) -> Cow<'_, [u8]> {
        if !self.has_bcc() {
            return Cow::Borrowed(&self.raw);
        }

        let (head, body) = self.raw.split_at(self.header_len);
        let mut out = Vec::with_capacity(self.raw.len());
        let mut skipping = false;
        for line in head.split_inclusive(|&b| b == b'\n') {
            let continuation = matches!(line.first(), Some(b' ' | b'\t'));
            if !continuation {
                skipping = header_name(line).is_some_and(|name| name.eq_ignore_ascii_case(BCC));
            }
            if !skipping {
                out.extend_from_slice(line);
            }
        }
        out.extend_from_slice(body);
        Cow::Owned(out)
    }
}

fn header_name(line: &[u8]) -> Option<&str> {
    let colon = line.iter().position(|&b| b == b':')?;
    std::str::from_utf8(&line[..colon]).ok().map(str::trim)
}

impl FromStr for Message {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("subject", &self.subject)
            .field("has_bcc", &self.has_bcc)
            .field("len", &self.raw.len())
            .finish()
    }
}

/// Every address-spec named in the `To`, `Cc` and `Bcc` headers of `message`.
///
/// Display names and group labels are dropped, groups are expanded, and
/// duplicates collapse. The set iterates in sorted order.
///
/// Addresses are parsed from the undecoded header values, so encoded-word
/// display names containing commas or semicolons do not split entries.
pub fn extract_recipients(message: &Message) -> Result<BTreeSet<String>, MessageError> {
    let (headers, _) = mailparse::parse_headers(&message.raw)?;
    let mut recipients = BTreeSet::new();
    for name in ADDRESS_HEADERS {
        for header in headers.get_all_headers(name) {
            let list =
                mailparse::addrparse_header(header).map_err(|source| MessageError::Address {
                    header: name.to_owned(),
                    source,
                })?;
            for addr in list.iter() {
                match addr {
                    MailAddr::Single(single) => {
                        recipients.insert(single.addr.clone());
                    }
                    MailAddr::Group(group) => {
                        recipients.extend(group.addrs.iter().map(|single| single.addr.clone()));
                    }
                }
            }
        }
    }
    Ok(recipients)
}
