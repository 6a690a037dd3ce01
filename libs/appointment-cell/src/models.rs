// libs/appointment-cell/src/models.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use uuid::Uuid;

use notification_cell::AppointmentNotice;

/// Canonical on-the-wire date format. Anything else is rejected at the
/// boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical on-the-wire time format (24-hour).
pub const TIME_FORMAT: &str = "%H:%M";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    // Display snapshot captured at booking time. Not re-synced if the
    // underlying profile changes later.
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "time_format")]
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub status_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Start of the appointment interval in the deployment's implicit
    /// local frame.
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn end(&self, duration: Duration) -> NaiveDateTime {
        self.start() + duration
    }

    pub fn to_notice(&self) -> AppointmentNotice {
        AppointmentNotice {
            doctor_name: self.doctor_name.clone(),
            patient_name: self.patient_name.clone(),
            patient_email: self.patient_email.clone(),
            patient_phone: self.patient_phone.clone(),
            date: self.date.format(DATE_FORMAT).to_string(),
            time: self.time.format(TIME_FORMAT).to_string(),
            reason: self.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Statuses that occupy their slot. `rejected` and `cancelled`
    /// release it for rebooking.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    pub const ACTIVE: [AppointmentStatus; 2] =
        [AppointmentStatus::Pending, AppointmentStatus::Approved];
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Per-doctor working day. Slot duration equals the grid interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start_of_day: NaiveTime,
    pub end_of_day: NaiveTime,
    pub interval_minutes: u32,
}

impl WorkingHours {
    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(self.interval_minutes as i64)
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_of_day: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_of_day: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            interval_minutes: 30,
        }
    }
}

/// Row sent to the store on insert; the store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "time_format")]
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Wire-level booking request. Date and time arrive as strings and are
/// validated before any store access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub doctor_id: Uuid,
    pub appointment_date: String,
    pub appointment_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

/// One entry of a doctor's day grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

/// A validated (date, time) pair drawn from the canonical formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotRef {
    pub fn parse(date: &str, time: &str) -> Result<Self, AppointmentError> {
        let date = parse_date(date)?;
        let time = parse_time(time)?;
        Ok(Self { date, time })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        AppointmentError::Validation(format!(
            "Invalid date '{}', expected YYYY-MM-DD",
            raw
        ))
    })
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|_| {
        AppointmentError::Validation(format!(
            "Invalid time '{}', expected 24-hour HH:MM",
            raw
        ))
    })
}

impl BookAppointmentRequest {
    /// Boundary validation: canonical formats, required display fields.
    pub fn validate(&self) -> Result<SlotRef, AppointmentError> {
        if self.doctor_name.trim().is_empty() {
            return Err(AppointmentError::Validation("doctor_name is required".to_string()));
        }
        if self.patient_name.trim().is_empty() {
            return Err(AppointmentError::Validation("patient_name is required".to_string()));
        }
        let email = self.patient_email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppointmentError::Validation(
                "patient_email must be a valid email address".to_string(),
            ));
        }
        SlotRef::parse(&self.appointment_date, &self.appointment_time)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Time slot is already booked")]
    SlotConflict { conflicts: Vec<Appointment> },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl AppointmentError {
    pub fn code(&self) -> &'static str {
        match self {
            AppointmentError::SlotConflict { .. } => "slot_conflict",
            AppointmentError::InvalidTransition { .. } => "invalid_transition",
            AppointmentError::NotAuthorized(_) => "not_authorized",
            AppointmentError::NotFound => "not_found",
            AppointmentError::Validation(_) => "validation_error",
            AppointmentError::Store(_) => "upstream_unavailable",
        }
    }
}

impl IntoResponse for AppointmentError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppointmentError::SlotConflict { .. } => StatusCode::CONFLICT,
            AppointmentError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppointmentError::NotAuthorized(_) => StatusCode::FORBIDDEN,
            AppointmentError::NotFound => StatusCode::NOT_FOUND,
            AppointmentError::Validation(_) => StatusCode::BAD_REQUEST,
            AppointmentError::Store(_) => StatusCode::BAD_GATEWAY,
        };

        tracing::error!("Error: {}: {}", status, self);

        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        // Conflicts are part of the contract: the caller picks another
        // slot based on what blocks this one.
        if let AppointmentError::SlotConflict { conflicts } = &self {
            body["conflicts"] = json!(conflicts);
        }

        (status, Json(body)).into_response()
    }
}

// ==============================================================================
// SERDE HELPERS
// ==============================================================================

/// `HH:MM` on the wire. Accepts `HH:MM:SS` on input since the store's
/// time columns round-trip with seconds.
pub mod time_format {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(super::TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_date_accepted() {
        assert!(parse_date("2025-10-25").is_ok());
    }

    #[test]
    fn non_canonical_dates_rejected() {
        assert!(parse_date("October 25, 2025").is_err());
        assert!(parse_date("25/10/2025").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }

    #[test]
    fn canonical_time_accepted() {
        assert_eq!(
            parse_time("10:00").unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
    }

    #[test]
    fn am_pm_times_rejected() {
        assert!(parse_time("10:00 AM").is_err());
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn released_statuses_are_not_active() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::Approved.is_active());
        assert!(!AppointmentStatus::Rejected.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
    }

    #[test]
    fn booking_request_validation() {
        let mut request = BookAppointmentRequest {
            doctor_id: uuid::Uuid::new_v4(),
            doctor_name: "Dr. Adams".to_string(),
            patient_name: "Jo Bloggs".to_string(),
            patient_email: "jo@example.com".to_string(),
            patient_phone: None,
            appointment_date: "2025-10-25".to_string(),
            appointment_time: "10:00".to_string(),
            reason: None,
        };
        assert!(request.validate().is_ok());

        request.patient_email = "not-an-email".to_string();
        assert!(matches!(
            request.validate(),
            Err(AppointmentError::Validation(_))
        ));
    }
}
