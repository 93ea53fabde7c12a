use crate::config::SmtpConfig;
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const SUBJECT: &str = "Childcare Attendance Notification";

/// What a parent is told after a sign-in or sign-out.
#[derive(Debug, Clone)]
pub struct AttendanceEmail {
    pub child_name: String,
    pub parent_email: String,
    /// "Signed In" or "Signed Out"
    pub action: &'static str,
    pub timestamp: NaiveDateTime,
    pub late: bool,
    pub notes: Option<String>,
}

impl AttendanceEmail {
    pub fn body(&self) -> String {
        let mut body = format!(
            "{} has been {}.\n\nTime: {}\n",
            self.child_name,
            self.action.to_lowercase(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
        );
        if self.late {
            body.push_str("This sign-in was recorded as late.\n");
        }
        if let Some(notes) = self.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            body.push_str(&format!("Notes: {}\n", notes.trim()));
        }
        body
    }
}

/// Sends attendance emails over SMTP. Without an SMTP host it only logs.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<Mailbox>,
    cc: Vec<Mailbox>,
}

impl Mailer {
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self> {
        let Some(host) = cfg.host.as_deref() else {
            return Ok(Self::disabled());
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("invalid SMTP host {host}"))?
            .port(cfg.port);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from_raw = cfg
            .from
            .as_deref()
            .or(cfg.username.as_deref())
            .ok_or_else(|| anyhow!("SMTP_FROM must be set when SMTP_HOST is set"))?;
        let from = from_raw
            .parse::<Mailbox>()
            .with_context(|| format!("invalid SMTP_FROM address {from_raw}"))?;

        let cc = cfg
            .notify_cc
            .iter()
            .map(|a| {
                a.parse::<Mailbox>()
                    .with_context(|| format!("invalid NOTIFY_CC address {a}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            transport: Some(builder.build()),
            from: Some(from),
            cc,
        })
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: None,
            cc: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    fn build_message(&self, from: Mailbox, email: &AttendanceEmail) -> Result<Message> {
        let to = email
            .parent_email
            .parse::<Mailbox>()
            .with_context(|| format!("invalid parent email {}", email.parent_email))?;

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN);
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }

        Ok(builder.body(email.body())?)
    }

    /// Errors are returned for the caller to log and report; they are never fatal.
    pub async fn send_attendance(&self, email: &AttendanceEmail) -> Result<()> {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            tracing::info!(
                child = %email.child_name,
                to = %email.parent_email,
                action = email.action,
                "Mail disabled, skipping attendance email"
            );
            return Ok(());
        };

        let message = self.build_message(from.clone(), email)?;
        transport.send(message).await.context("SMTP send failed")?;

        tracing::info!(to = %email.parent_email, action = email.action, "Attendance email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn email(late: bool, notes: Option<&str>) -> AttendanceEmail {
        AttendanceEmail {
            child_name: "Mia".into(),
            parent_email: "sarah@example.com".into(),
            action: "Signed In",
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 2)
                .unwrap()
                .and_hms_opt(9, 5, 0)
                .unwrap(),
            late,
            notes: notes.map(String::from),
        }
    }

    #[test]
    fn body_mentions_action_and_time() {
        let body = email(false, None).body();
        assert!(body.starts_with("Mia has been signed in."));
        assert!(body.contains("2025-06-02 09:05:00"));
        assert!(!body.contains("late"));
    }

    #[test]
    fn body_flags_late_and_notes() {
        let body = email(true, Some(" bring jacket ")).body();
        assert!(body.contains("recorded as late"));
        assert!(body.contains("Notes: bring jacket"));
    }

    #[test]
    fn disabled_without_host() {
        let mailer = Mailer::from_config(&SmtpConfig::default()).unwrap();
        assert!(!mailer.is_enabled());
    }

    #[test]
    fn host_without_sender_is_a_config_error() {
        let cfg = SmtpConfig {
            host: Some("smtp.example.com".into()),
            port: 587,
            ..SmtpConfig::default()
        };
        assert!(Mailer::from_config(&cfg).is_err());
    }

    #[actix_web::test]
    async fn message_includes_cc() {
        let cfg = SmtpConfig {
            host: Some("smtp.example.com".into()),
            port: 587,
            from: Some("center@example.com".into()),
            notify_cc: vec!["office@example.com".into()],
            ..SmtpConfig::default()
        };
        let mailer = Mailer::from_config(&cfg).unwrap();
        let from: Mailbox = "center@example.com".parse().unwrap();
        let msg = mailer.build_message(from, &email(false, None)).unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("Cc: office@example.com"));
        assert!(raw.contains("Subject: Childcare Attendance Notification"));
    }

    #[actix_web::test]
    async fn disabled_send_is_ok() {
        assert!(Mailer::disabled().send_attendance(&email(false, None)).await.is_ok());
    }
}
