use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::{config::Config, models::forms::GuestRequest};

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    inbox: Mailbox,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;
        let inbox: Mailbox = match config.contact_inbox.as_deref() {
            Some(addr) => addr.parse().ok()?,
            None => from.clone(),
        };

        Some(Self { transport, from, inbox })
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    async fn send_email(
        &self,
        to: Mailbox,
        reply_to: Option<Mailbox>,
        subject: &str,
        text: &str,
        html: &str,
    ) -> anyhow::Result<()> {
        let mut builder = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }
        let email = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .context("Failed to build email")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;
        Ok(())
    }

    /// Tell the editors a guest request arrived through the contact page.
    pub async fn send_guest_request_notification(&self, req: &GuestRequest) -> anyhow::Result<()> {
        let topic = req.topic.as_deref().unwrap_or("-");
        let phone = req.phone.as_deref().unwrap_or("-");
        let subject = format!("New guest request from {}", req.name);

        let text = format!(
            "New guest request ({lang})\n\n\
            Name: {name}\n\
            Email: {email}\n\
            Phone: {phone}\n\
            Topic: {topic}\n\n\
            {message}",
            lang = req.language_code,
            name = req.name,
            email = req.email,
            message = req.message,
        );

        let html = format!(
            r#"<h1 style="font-size:20px">New guest request ({lang})</h1>
<table role="presentation" cellpadding="6">
  <tr><td>Name</td><td><strong>{name}</strong></td></tr>
  <tr><td>Email</td><td><a href="mailto:{email}">{email}</a></td></tr>
  <tr><td>Phone</td><td>{phone}</td></tr>
  <tr><td>Topic</td><td>{topic}</td></tr>
</table>
<p style="white-space:pre-wrap">{message}</p>"#,
            lang = req.language_code,
            name = escape_html(&req.name),
            email = escape_html(&req.email),
            phone = escape_html(phone),
            topic = escape_html(topic),
            message = escape_html(&req.message),
        );

        // Replies go straight to the guest; an unparseable address just drops Reply-To
        let reply_to = req.email.parse::<Mailbox>().ok();
        self.send_email(self.inbox.clone(), reply_to, &subject, &text, &html).await
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }
}
