// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, NewAppointment};

/// External collaborator boundary for appointment persistence. The
/// booking coordinator and lifecycle manager only ever see this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Appointments for a doctor on a date, filtered by status set.
    async fn find_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        status_in: &[AppointmentStatus],
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get_appointment(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    /// Insert a new appointment; the store assigns the id.
    async fn insert_appointment(
        &self,
        new: &NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        notes: Option<String>,
        updated_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;
}

/// PostgREST-backed implementation over the `appointments` table.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn status_filter(status_in: &[AppointmentStatus]) -> String {
        let statuses: Vec<String> = status_in.iter().map(|s| s.to_string()).collect();
        format!("status=in.({})", statuses.join(","))
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::Store(format!("Failed to parse appointments: {}", e)))
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        status_in: &[AppointmentStatus],
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&{}&order=time.asc",
            doctor_id,
            date,
            Self::status_filter(status_in),
        );
        debug!("Fetching appointments for doctor {} on {}", doctor_id, date);
        self.fetch(&path, auth_token).await
    }

    async fn find_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=date.desc,time.desc",
            patient_id
        );
        self.fetch(&path, auth_token).await
    }

    async fn find_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=date.desc,time.desc",
            doctor_id
        );
        self.fetch(&path, auth_token).await
    }

    async fn get_appointment(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let mut result = self.fetch(&path, auth_token).await?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(result.remove(0))
    }

    async fn insert_appointment(
        &self,
        new: &NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(new)
            .map_err(|e| AppointmentError::Store(format!("Failed to serialize appointment: {}", e)))?;

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Store("Insert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppointmentError::Store(format!("Failed to parse created appointment: {}", e)))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        notes: Option<String>,
        updated_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut update = json!({
            "status": status.to_string(),
            "updated_at": updated_at.to_rfc3339(),
        });
        if let Some(notes) = notes {
            update["status_notes"] = json!(notes);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        let row = result.into_iter().next().ok_or(AppointmentError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| AppointmentError::Store(format!("Failed to parse updated appointment: {}", e)))
    }
}
