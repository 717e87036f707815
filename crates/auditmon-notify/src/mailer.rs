use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP delivery for rendered reports.
pub struct ReportMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl ReportMailer {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?.port(smtp_port);
        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }
        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
        })
    }

    /// Send one HTML report to every recipient, retrying each up to
    /// three times with exponential backoff. Failures are logged per
    /// recipient; the last error is returned after all recipients were
    /// attempted.
    pub async fn send(&self, subject: &str, html: &str, recipients: &[String]) -> Result<()> {
        if recipients.is_empty() {
            tracing::info!("No recipients configured, skipping report email");
            return Ok(());
        }

        let mut last_err: Option<anyhow::Error> = None;
        for recipient in recipients {
            let email = Message::builder()
                .from(self.from.parse()?)
                .to(recipient.parse()?)
                .subject(subject)
                .header(ContentType::TEXT_HTML)
                .body(html.to_string())?;

            let mut sent = false;
            for attempt in 0..3u32 {
                match self.transport.send(email.clone()).await {
                    Ok(_) => {
                        sent = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            recipient = %recipient,
                            error = %e,
                            "Report email send failed, retrying"
                        );
                        if attempt < 2 {
                            tokio::time::sleep(std::time::Duration::from_millis(
                                100 * 2u64.pow(attempt),
                            ))
                            .await;
                        } else {
                            last_err = Some(e.into());
                        }
                    }
                }
            }
            if !sent {
                tracing::error!(recipient = %recipient, "Report email failed after 3 attempts");
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
