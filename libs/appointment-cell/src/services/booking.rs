// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::{NotificationDispatcher, NotificationService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, NewAppointment,
    SlotRef, TimeSlot, WorkingHours,
};
use crate::services::conflict;
use crate::services::slots;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

/// Orchestrates slot availability and booking against the appointment
/// store. Owns the read-check-recheck-write policy for double-booking
/// mitigation.
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    working_hours: WorkingHours,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            store: Arc::new(SupabaseAppointmentStore::new(supabase)),
            notifier: Arc::new(NotificationService::new(config)),
            working_hours: WorkingHours::default(),
        }
    }

    /// Wire up explicit collaborators. Used by tests and by deployments
    /// with per-doctor schedules.
    pub fn with_parts(
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        working_hours: WorkingHours,
    ) -> Self {
        Self {
            store,
            notifier,
            working_hours,
        }
    }

    pub fn working_hours(&self) -> &WorkingHours {
        &self.working_hours
    }

    /// The doctor's day grid with availability flags.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: chrono::NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, AppointmentError> {
        let existing = self
            .store
            .find_appointments(doctor_id, date, &AppointmentStatus::ACTIVE, auth_token)
            .await?;

        Ok(slots::day_schedule(&self.working_hours, &existing))
    }

    /// All appointments blocking a candidate slot. Empty means bookable.
    pub async fn check_availability(
        &self,
        doctor_id: Uuid,
        slot: SlotRef,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let existing = self
            .store
            .find_appointments(doctor_id, slot.date, &AppointmentStatus::ACTIVE, auth_token)
            .await?;

        let conflicts = conflict::find_conflicts(
            slot.start(),
            self.working_hours.slot_duration(),
            &existing,
        );
        Ok(conflicts.into_iter().cloned().collect())
    }

    /// Book a slot for a patient. The conflict check runs twice: once
    /// up front to fail fast, and once immediately before the insert to
    /// narrow the window between concurrent requests. The window is not
    /// closed: without a conditional-insert primitive in the store, two
    /// requests interleaving between re-check and write can still both
    /// commit.
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let slot = request.validate()?;

        info!(
            "Booking request for doctor {} on {} at {}",
            request.doctor_id, slot.date, slot.time
        );

        let conflicts = self
            .check_availability(request.doctor_id, slot, auth_token)
            .await?;
        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for doctor {} at {} {} ({} blocking)",
                request.doctor_id,
                slot.date,
                slot.time,
                conflicts.len()
            );
            return Err(AppointmentError::SlotConflict { conflicts });
        }

        // Re-check just before the write.
        let conflicts = self
            .check_availability(request.doctor_id, slot, auth_token)
            .await?;
        if !conflicts.is_empty() {
            warn!(
                "Conflict appeared between check and commit for doctor {} at {} {}",
                request.doctor_id, slot.date, slot.time
            );
            return Err(AppointmentError::SlotConflict { conflicts });
        }

        let now = Utc::now();
        let new = NewAppointment {
            doctor_id: request.doctor_id,
            patient_id,
            doctor_name: request.doctor_name.trim().to_string(),
            patient_name: request.patient_name.trim().to_string(),
            patient_email: request.patient_email.trim().to_string(),
            patient_phone: request.patient_phone.clone(),
            date: slot.date,
            time: slot.time,
            reason: request.reason.clone(),
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let appointment = self.store.insert_appointment(&new, auth_token).await?;

        info!(
            "Appointment {} booked for patient {} with doctor {}",
            appointment.id, patient_id, request.doctor_id
        );

        // Fire-and-forget: a notification failure never rolls back or
        // fails the booking.
        let notifier = Arc::clone(&self.notifier);
        let notice = appointment.to_notice();
        tokio::spawn(async move {
            notifier.notify_booking_created(&notice).await;
        });

        Ok(appointment)
    }

    /// All appointments for the authenticated caller, doctor or
    /// patient side, newest first.
    pub async fn appointments_for_user(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppointmentError::Validation("Invalid user id".to_string()))?;

        debug!("Listing appointments for user {} ({:?})", user_id, user.role);

        if user.is_doctor() {
            self.store.find_for_doctor(user_id, auth_token).await
        } else {
            self.store.find_for_patient(user_id, auth_token).await
        }
    }

    pub async fn get_appointment(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.store.get_appointment(id, auth_token).await
    }
}
