use serde::Deserialize;

use crate::domain::{
    Message, MessageError, MessageId, SenderConfig, extract_recipients, format_delivery_time,
    yesno,
};

/// Name of the multipart file part carrying the message.
pub const MESSAGE_PART: &str = "message";
/// Filename attached to [`MESSAGE_PART`].
pub const MESSAGE_FILENAME: &str = "message.mime";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body of a `messages.mime` POST: text fields plus the serialized message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeForm {
    pub fields: Vec<(String, String)>,
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesMimeJsonResponse {
    id: String,
}

pub fn encode_messages_mime_form(
    config: &SenderConfig,
    message: &Message,
) -> Result<MimeForm, MessageError> {
    let mut fields = Vec::<(String, String)>::new();

    let to = extract_recipients(message)?
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ");
    fields.push(("to".to_owned(), to));

    for tag in &config.tags {
        fields.push(("o:tag".to_owned(), tag.clone()));
    }
    if let Some(time) = config.deliverytime.as_ref() {
        fields.push(("o:deliverytime".to_owned(), format_delivery_time(time)));
    }
    push_flag(&mut fields, "o:dkim", config.dkim);
    push_flag(&mut fields, "o:testmode", config.testmode);
    push_flag(&mut fields, "o:tracking", config.tracking);
    if let Some(clicks) = config.tracking_clicks {
        fields.push(("o:tracking-clicks".to_owned(), yesno(clicks).to_owned()));
    }
    push_flag(&mut fields, "o:tracking-opens", config.tracking_opens);
    for (name, value) in &config.headers {
        fields.push((format!("h:{name}"), value.clone()));
    }
    for (name, value) in &config.variables {
        fields.push((format!("v:{name}"), value.clone()));
    }

    Ok(MimeForm {
        fields,
        message: message.to_wire().into_owned(),
    })
}

fn push_flag(fields: &mut Vec<(String, String)>, key: &str, flag: Option<bool>) {
    if let Some(flag) = flag {
        fields.push((key.to_owned(), yesno(flag).to_owned()));
    }
}

pub fn decode_messages_mime_json_response(json: &str) -> Result<MessageId, TransportError> {
    let parsed: MessagesMimeJsonResponse = serde_json::from_str(json)?;
    Ok(MessageId::from_provider(&parsed.id))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::domain::{ApiKey, Domain, TrackingClicks};

    const MEET_ME: &str = "Subject: Meet me\r\n\
        To: my.beloved@love.love\r\n\
        From: me@here.qq\r\n\
        \r\n\
        Oh my beloved!\r\n";

    fn config() -> SenderConfig {
        SenderConfig::new(
            Domain::new("example.nil").unwrap(),
            ApiKey::new("hunter2").unwrap(),
        )
    }

    fn field<'a>(form: &'a MimeForm, key: &str) -> Vec<&'a str> {
        form.fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn minimal_config_sends_only_recipients() {
        let msg = Message::parse(MEET_ME).unwrap();
        let form = encode_messages_mime_form(&config(), &msg).unwrap();
        assert_eq!(
            form.fields,
            vec![("to".to_owned(), "my.beloved@love.love".to_owned())]
        );
        assert_eq!(form.message, MEET_ME.as_bytes());
    }

    #[test]
    fn full_config_populates_every_option() {
        let mut config = config();
        config.tags = vec!["foo".to_owned()];
        config.deliverytime = Some(
            FixedOffset::west_opt(5 * 3600)
                .unwrap()
                .with_ymd_and_hms(2021, 3, 8, 10, 36, 31)
                .unwrap(),
        );
        config.dkim = Some(true);
        config.testmode = Some(true);
        config.tracking = Some(true);
        config.tracking_clicks = Some(TrackingClicks::On);
        config.tracking_opens = Some(true);
        config
            .headers
            .insert("Reply-To".to_owned(), "reply.hole@over.there".to_owned());
        config
            .headers
            .insert("User-Agent".to_owned(), "mailgun-sender".to_owned());
        config.variables.insert("foo".to_owned(), "bar".to_owned());
        config.variables.insert("gnusto".to_owned(), "cleesh".to_owned());

        let msg = Message::parse(MEET_ME).unwrap();
        let form = encode_messages_mime_form(&config, &msg).unwrap();
        let expected = [
            ("to", "my.beloved@love.love"),
            ("o:tag", "foo"),
            ("o:deliverytime", "Mon, 08 Mar 2021 10:36:31 -0500"),
            ("o:dkim", "yes"),
            ("o:testmode", "yes"),
            ("o:tracking", "yes"),
            ("o:tracking-clicks", "yes"),
            ("o:tracking-opens", "yes"),
            ("h:Reply-To", "reply.hole@over.there"),
            ("h:User-Agent", "mailgun-sender"),
            ("v:foo", "bar"),
            ("v:gnusto", "cleesh"),
        ]
        .map(|(k, v)| (k.to_owned(), v.to_owned()));
        assert_eq!(form.fields, expected.to_vec());
    }

    #[test]
    fn disabled_flags_encode_as_no() {
        let mut config = config();
        config.tags = vec!["foo".to_owned(), "bar".to_owned()];
        config.dkim = Some(false);
        config.testmode = Some(false);
        config.tracking = Some(false);
        config.tracking_clicks = Some(TrackingClicks::Off);
        config.tracking_opens = Some(false);

        let msg = Message::parse(MEET_ME).unwrap();
        let form = encode_messages_mime_form(&config, &msg).unwrap();
        assert_eq!(field(&form, "o:tag"), vec!["foo", "bar"]);
        for key in [
            "o:dkim",
            "o:testmode",
            "o:tracking",
            "o:tracking-clicks",
            "o:tracking-opens",
        ] {
            assert_eq!(field(&form, key), vec!["no"], "{key}");
        }
    }

    #[test]
    fn tracking_clicks_html_only() {
        let mut config = config();
        config.tracking_clicks = Some(TrackingClicks::HtmlOnly);
        let msg = Message::parse(MEET_ME).unwrap();
        let form = encode_messages_mime_form(&config, &msg).unwrap();
        assert_eq!(field(&form, "o:tracking-clicks"), vec!["htmlonly"]);
    }

    #[test]
    fn bcc_is_addressed_but_not_transmitted() {
        let raw = "Subject: Secret\r\n\
            To: no.one@nil.com\r\n\
            CC: cee.cee@shining.sea.com\r\n\
            BCC: before.cee.cee@ancient.spqr.com\r\n\
            \r\n\
            body\r\n";
        let msg = Message::parse(raw).unwrap();
        let form = encode_messages_mime_form(&config(), &msg).unwrap();
        assert_eq!(
            field(&form, "to"),
            vec!["before.cee.cee@ancient.spqr.com, cee.cee@shining.sea.com, no.one@nil.com"]
        );
        let body = String::from_utf8(form.message).unwrap();
        assert!(!body.to_ascii_lowercase().contains("bcc"));
        assert!(!body.contains("before.cee.cee"));
        assert!(body.contains("CC: cee.cee@shining.sea.com\r\n"));
    }

    #[test]
    fn decodes_id_without_brackets() {
        let json = r#"{"id": "<20210308184521.1.9AE5400C1FA672B2@example.nil>", "message": "Queued. Thank you."}"#;
        let id = decode_messages_mime_json_response(json).unwrap();
        assert_eq!(id.as_str(), "20210308184521.1.9AE5400C1FA672B2@example.nil");
    }

    #[test]
    fn rejects_missing_or_non_string_id() {
        assert!(decode_messages_mime_json_response(r#"{"message": "Queued."}"#).is_err());
        assert!(decode_messages_mime_json_response(r#"{"id": 5}"#).is_err());
        assert!(decode_messages_mime_json_response("not json").is_err());
    }
}
