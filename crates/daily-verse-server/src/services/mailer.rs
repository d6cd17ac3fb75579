//! Outbound verse email

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;
use verse_core::{MailSender, Result, User, Verse, VerseError};

const SENDER_NAME: &str = "Daily Bible Verse";

/// Sends verse emails through an SMTP relay (STARTTLS)
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    app_url: String,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from_address: &str,
        app_url: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| VerseError::Config(format!("Invalid SMTP host {}: {}", host, e)))?
            .port(port);
        if let Some((user, pass)) = credentials {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
            from: sender(from_address)?,
            app_url: app_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send_verse(&self, verse: &Verse, recipient: &User) -> Result<()> {
        let message = build_message(&self.from, verse, recipient, &self.app_url)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| VerseError::TransportFailure(e.to_string()))?;

        info!(
            "Email sent to {}: {}",
            recipient.email,
            response.message().collect::<Vec<_>>().join(" ")
        );
        Ok(())
    }
}

/// Development mailer: logs instead of sending
pub struct LogMailer {
    from: Mailbox,
    app_url: String,
}

impl LogMailer {
    pub fn new(from_address: &str, app_url: &str) -> Result<Self> {
        Ok(Self {
            from: sender(from_address)?,
            app_url: app_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MailSender for LogMailer {
    async fn send_verse(&self, verse: &Verse, recipient: &User) -> Result<()> {
        // Build anyway so malformed addresses fail the same way SMTP would
        build_message(&self.from, verse, recipient, &self.app_url)?;
        info!(
            "[no SMTP configured] would send {} to {}",
            verse.reference, recipient.email
        );
        Ok(())
    }
}

fn sender(address: &str) -> Result<Mailbox> {
    format!("{} <{}>", SENDER_NAME, address)
        .parse()
        .map_err(|e| VerseError::Config(format!("Invalid sender address {}: {}", address, e)))
}

fn build_message(from: &Mailbox, verse: &Verse, recipient: &User, app_url: &str) -> Result<Message> {
    let to: Mailbox = recipient
        .email
        .parse()
        .map_err(|e| VerseError::TransportFailure(format!("Invalid recipient address: {}", e)))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(format!("Daily Bible Verse: {}", verse.reference))
        .header(ContentType::TEXT_HTML)
        .body(render_email(verse, &recipient.full_name, app_url))
        .map_err(|e| VerseError::TransportFailure(e.to_string()))
}

/// HTML body for one recipient
pub fn render_email(verse: &Verse, recipient_name: &str, app_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Your Daily Bible Verse</title>
  <style>
    body {{ font-family: 'Helvetica Neue', Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ text-align: center; padding-bottom: 20px; border-bottom: 1px solid #eee; margin-bottom: 20px; }}
    .verse {{ font-size: 18px; font-style: italic; text-align: center; margin: 20px 0; padding: 15px; background-color: #f9f7f0; border-radius: 5px; }}
    .reference {{ text-align: right; font-weight: bold; margin-bottom: 20px; }}
    h2 {{ color: #5B8C5A; border-bottom: 1px solid #eee; padding-bottom: 5px; }}
    .footer {{ margin-top: 30px; font-size: 12px; text-align: center; color: #777; border-top: 1px solid #eee; padding-top: 20px; }}
  </style>
</head>
<body>
  <div class="header"><h1>Daily Dose of Bible Verse</h1></div>
  <p>Hello {name},</p>
  <p>Here is your daily Bible verse to inspire and guide your day:</p>
  <div class="verse">{text}</div>
  <div class="reference">- {reference}</div>
  <h2>Understanding</h2>
  <p>{explanation}</p>
  <h2>Today's Application</h2>
  <p>{application}</p>
  <div class="footer">
    <p>Daily Dose of Bible Verse - Spiritual nourishment for your daily journey</p>
    <p>To unsubscribe from these emails, visit your <a href="{app_url}/dashboard">account dashboard</a>.</p>
  </div>
</body>
</html>
"#,
        name = escape_html(recipient_name),
        text = escape_html(&verse.text),
        reference = escape_html(&verse.reference),
        explanation = escape_html(&verse.explanation),
        application = escape_html(&verse.application),
        app_url = escape_html(app_url),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
