use std::io;

use mailgun_sender::{MailgunSender, Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let domain = std::env::var("MAILGUN_DOMAIN").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "MAILGUN_DOMAIN environment variable is required",
        )
    })?;
    let to = std::env::var("MAILGUN_TO").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "MAILGUN_TO environment variable is required",
        )
    })?;
    let base_url = std::env::var("MAILGUN_BASE_URL")
        .unwrap_or_else(|_| "https://api.mailgun.net".to_owned());

    let mut sender = MailgunSender::from_config_value(
        serde_json::json!({
            "base-url": base_url,
            "domain": domain,
            "api-key": {"env": "MAILGUN_API_KEY"},
            "tags": ["mailgun-sender-demo"],
            "testmode": true,
            "headers": {"User-Agent": "mailgun-sender"},
        }),
        None,
    )?;

    let msg = Message::parse(format!(
        "From: me@{domain}\r\n\
         To: {to}\r\n\
         Subject: Hello from the mailgun-sender demo\r\n\
         \r\n\
         This message was submitted in test mode.\r\n"
    ))?;

    let id = sender.send(&msg).await?;
    println!("queued: {id}");

    Ok(())
}
