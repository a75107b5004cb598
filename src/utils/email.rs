use lettre::message::{Attachment, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rollcall_config::EmailConfig;
use rollcall_core::AppError;
use tracing::instrument;

/// What a teacher needs to know about a new ticket.
#[derive(Debug, Clone)]
pub struct TicketNotice {
    pub student_name: String,
    pub student_sap_id: String,
    pub class_key: String,
    pub subject: String,
    pub date: String,
    pub reason: String,
}

/// A file to attach, already in memory.
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, notice, attachment), fields(subject = %notice.subject))]
    pub async fn send_ticket_notification(
        &self,
        to_email: &str,
        notice: &TicketNotice,
        attachment: Option<EmailAttachment>,
    ) -> Result<(), AppError> {
        let subject = format!("Attendance Request - {}", notice.subject);
        let attachment_name = attachment.as_ref().map(|a| a.file_name.as_str());
        let text_body = ticket_text(notice, attachment_name);
        let html_body = ticket_html(notice, attachment_name);

        self.send_email(to_email, &subject, &text_body, &html_body, attachment)
            .await
    }

    #[instrument(skip(self, html_body, text_body, attachment))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
        attachment: Option<EmailAttachment>,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let alternative = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(text_body.to_string()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html_body.to_string()),
            );

        let body = match attachment {
            Some(file) => {
                let content_type = header::ContentType::parse(&file.content_type).map_err(|e| {
                    AppError::internal_error(format!("Invalid attachment content type: {}", e))
                })?;
                MultiPart::mixed()
                    .multipart(alternative)
                    .singlepart(Attachment::new(file.file_name).body(file.content, content_type))
            }
            None => alternative,
        };

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal_error(format!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(body)
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal_error(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal_error(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

fn ticket_text(notice: &TicketNotice, attachment_name: Option<&str>) -> String {
    let mut text = format!(
        "Attendance Request\n\n\
         Student: {} ({})\n\
         Class: {}\n\
         Subject: {}\n\
         Date: {}\n\
         Reason: {}\n",
        notice.student_name,
        notice.student_sap_id,
        notice.class_key,
        notice.subject,
        notice.date,
        notice.reason
    );
    if let Some(name) = attachment_name {
        text.push_str(&format!("Attachment: {}\n", name));
    }
    text
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn ticket_html(notice: &TicketNotice, attachment_name: Option<&str>) -> String {
    let attachment = attachment_name
        .map(|name| {
            format!(
                r#"<p style="margin: 0 0 8px 0;">Attachment: {}</p>"#,
                escape_html(name)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Attendance Request</title>
</head>
<body style="margin: 0; padding: 20px; font-family: Arial, sans-serif; color: #333333;">
    <h3 style="margin: 0 0 16px 0;">Attendance Request</h3>
    <p style="margin: 0 0 8px 0;">Student: {} ({})</p>
    <p style="margin: 0 0 8px 0;">Class: {}</p>
    <p style="margin: 0 0 8px 0;">Subject: {}</p>
    <p style="margin: 0 0 8px 0;">Date: {}</p>
    <p style="margin: 0 0 8px 0;">Reason: {}</p>
    {}
</body>
</html>"#,
        escape_html(&notice.student_name),
        escape_html(&notice.student_sap_id),
        escape_html(&notice.class_key),
        escape_html(&notice.subject),
        escape_html(&notice.date),
        escape_html(&notice.reason),
        attachment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> TicketNotice {
        TicketNotice {
            student_name: "Asha <Rao>".to_string(),
            student_sap_id: "S1".to_string(),
            class_key: "2023-SE-IT-A-morning".to_string(),
            subject: "Maths".to_string(),
            date: "13-05-2024".to_string(),
            reason: "Marked absent by mistake".to_string(),
        }
    }

    #[test]
    fn test_ticket_text_mentions_attachment_only_when_present() {
        let without = ticket_text(&notice(), None);
        assert!(without.contains("Student: Asha <Rao> (S1)"));
        assert!(!without.contains("Attachment"));

        let with = ticket_text(&notice(), Some("letter.pdf"));
        assert!(with.contains("Attachment: letter.pdf"));
    }

    #[test]
    fn test_ticket_html_escapes_user_input() {
        let html = ticket_html(&notice(), Some("a&b.pdf"));
        assert!(html.contains("Asha &lt;Rao&gt; (S1)"));
        assert!(html.contains("Attachment: a&amp;b.pdf"));
    }
}
