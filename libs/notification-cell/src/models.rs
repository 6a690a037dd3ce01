use serde::{Deserialize, Serialize};

/// Snapshot of an appointment used to compose patient notifications.
/// Carries the denormalized contact fields captured at booking time so
/// no profile lookup is needed to deliver a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentNotice {
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub date: String,
    pub time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationChannel {
    Email,
    Sms,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
        }
    }
}

/// Composed message before channel-specific formatting.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}
