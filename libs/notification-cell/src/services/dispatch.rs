use async_trait::async_trait;
use tracing::{info, warn};

use shared_config::AppConfig;

use crate::models::{AppointmentNotice, NotificationChannel, NotificationMessage};
use crate::services::providers::{SendGridProvider, TwilioProvider};

/// Boundary contract consumed by the scheduling core. Dispatch is
/// fire-and-forget: implementations log provider failures and never
/// return an error to the caller.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_booking_created(&self, notice: &AppointmentNotice);
    async fn notify_status_changed(&self, notice: &AppointmentNotice, new_status: &str);
}

pub struct NotificationService {
    channels: Vec<NotificationChannel>,
    email: SendGridProvider,
    sms: TwilioProvider,
    base_app_url: String,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        // A channel is only live when its provider credentials are
        // actually present; enabling it in config alone is not enough.
        let channels = config
            .notify_channels
            .iter()
            .filter_map(|c| match c.as_str() {
                "email" if config.is_email_configured() => Some(NotificationChannel::Email),
                "email" => {
                    warn!("Email channel enabled but SendGrid is not configured");
                    None
                }
                "sms" if config.is_sms_configured() => Some(NotificationChannel::Sms),
                "sms" => {
                    warn!("SMS channel enabled but Twilio is not configured");
                    None
                }
                other => {
                    warn!("Unknown notification channel in config: {}", other);
                    None
                }
            })
            .collect();

        Self {
            channels,
            email: SendGridProvider::new(&config.sendgrid_api_key, &config.sendgrid_from_email),
            sms: TwilioProvider::new(
                &config.twilio_account_sid,
                &config.twilio_auth_token,
                &config.twilio_from_number,
            ),
            base_app_url: config.base_app_url.clone(),
        }
    }

    fn booking_message(&self, notice: &AppointmentNotice) -> NotificationMessage {
        NotificationMessage {
            subject: "Appointment Request Received - E-Booklet".to_string(),
            body: format!(
                "Hello {},\n\nYour appointment with {} has been requested for {} at {}.\n\
                 Reason: {}\n\nYou will receive a confirmation once the doctor approves it.\n\
                 View your appointments here: {}/patient",
                notice.patient_name,
                notice.doctor_name,
                notice.date,
                notice.time,
                notice.reason.as_deref().unwrap_or("General consultation"),
                self.base_app_url,
            ),
        }
    }

    fn status_message(&self, notice: &AppointmentNotice, new_status: &str) -> NotificationMessage {
        let summary = match new_status {
            "approved" => format!(
                "Your appointment with {} on {} at {} has been approved!",
                notice.doctor_name, notice.date, notice.time
            ),
            "rejected" => format!(
                "Your appointment request with {} on {} at {} has been declined. \
                 Please contact the clinic for more information.",
                notice.doctor_name, notice.date, notice.time
            ),
            "cancelled" => format!(
                "Your appointment with {} on {} at {} has been cancelled.",
                notice.doctor_name, notice.date, notice.time
            ),
            "completed" => format!(
                "Your appointment with {} has been marked as completed. Thank you for visiting!",
                notice.doctor_name
            ),
            other => format!("Your appointment status has been updated to {}", other),
        };

        NotificationMessage {
            subject: format!("Appointment {} - E-Booklet", capitalize(new_status)),
            body: format!("Hello {},\n\n{}", notice.patient_name, summary),
        }
    }

    /// Attempt each enabled channel. A channel without a usable contact
    /// or with a provider failure is skipped with a warning.
    async fn dispatch(&self, notice: &AppointmentNotice, message: &NotificationMessage) {
        let mut sent: Vec<&str> = Vec::new();

        if self.channels.contains(&NotificationChannel::Email) {
            match self
                .email
                .send_email(&notice.patient_email, &message.subject, &message.body)
                .await
            {
                Ok(()) => sent.push(NotificationChannel::Email.as_str()),
                Err(e) => warn!("Failed to send email notification: {}", e),
            }
        }

        if self.channels.contains(&NotificationChannel::Sms) {
            if let Some(phone) = &notice.patient_phone {
                match self.sms.send_sms(phone, &message.body).await {
                    Ok(()) => sent.push(NotificationChannel::Sms.as_str()),
                    Err(e) => warn!("Failed to send SMS notification: {}", e),
                }
            }
        }

        if sent.is_empty() {
            warn!(
                "No notification delivered for patient {} (channels configured: {})",
                notice.patient_name,
                self.channels.len()
            );
        } else {
            info!("Notification sent via {:?} to {}", sent, notice.patient_name);
        }
    }
}

#[async_trait]
impl NotificationDispatcher for NotificationService {
    async fn notify_booking_created(&self, notice: &AppointmentNotice) {
        let message = self.booking_message(notice);
        self.dispatch(notice, &message).await;
    }

    async fn notify_status_changed(&self, notice: &AppointmentNotice, new_status: &str) {
        let message = self.status_message(notice, new_status);
        self.dispatch(notice, &message).await;
    }
}

/// Dispatcher that drops everything. Used in tests and when no
/// provider is configured.
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopDispatcher {
    async fn notify_booking_created(&self, _notice: &AppointmentNotice) {}
    async fn notify_status_changed(&self, _notice: &AppointmentNotice, _new_status: &str) {}
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
