// libs/appointment-cell/src/services/lifecycle.rs
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::{NotificationDispatcher, NotificationService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

/// Validates and applies appointment status transitions.
///
/// pending  -> approved | rejected | cancelled
/// approved -> completed | cancelled
/// rejected, cancelled, completed are terminal.
pub struct LifecycleService {
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl LifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            store: Arc::new(SupabaseAppointmentStore::new(supabase)),
            notifier: Arc::new(NotificationService::new(config)),
        }
    }

    pub fn with_parts(
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self { store, notifier }
    }

    /// All statuses reachable from `current`.
    pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current {
            AppointmentStatus::Pending => &[
                AppointmentStatus::Approved,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Approved => {
                &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            // Terminal states admit nothing.
            AppointmentStatus::Rejected
            | AppointmentStatus::Cancelled
            | AppointmentStatus::Completed => &[],
        }
    }

    pub fn validate_transition(
        current: AppointmentStatus,
        new: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition {} -> {}", current, new);

        if !Self::valid_transitions(current).contains(&new) {
            warn!("Invalid status transition attempted: {} -> {}", current, new);
            return Err(AppointmentError::InvalidTransition {
                from: current,
                to: new,
            });
        }
        Ok(())
    }

    /// Role check per the transition table: doctors decide approval,
    /// rejection and completion for their own appointments; patients
    /// withdraw their own; an approved appointment can be withdrawn by
    /// either side.
    fn authorize(
        actor: &User,
        appointment: &Appointment,
        new: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        let actor_id = Uuid::parse_str(&actor.id)
            .map_err(|_| AppointmentError::Validation("Invalid user id".to_string()))?;

        let is_the_doctor = actor_id == appointment.doctor_id;
        let is_the_patient = actor_id == appointment.patient_id;

        let allowed = match (appointment.status, new) {
            (AppointmentStatus::Pending, AppointmentStatus::Approved)
            | (AppointmentStatus::Pending, AppointmentStatus::Rejected)
            | (AppointmentStatus::Approved, AppointmentStatus::Completed) => is_the_doctor,
            (AppointmentStatus::Pending, AppointmentStatus::Cancelled) => is_the_patient,
            (AppointmentStatus::Approved, AppointmentStatus::Cancelled) => {
                is_the_patient || is_the_doctor
            }
            // Anything else already failed transition validation.
            _ => false,
        };

        if !allowed {
            return Err(AppointmentError::NotAuthorized(format!(
                "Not allowed to set this appointment to {}",
                new
            )));
        }
        Ok(())
    }

    /// Apply a status change on behalf of `actor`. Bumps `updated_at`
    /// and notifies the patient on success.
    pub async fn change_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        notes: Option<String>,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.store.get_appointment(appointment_id, auth_token).await?;

        Self::validate_transition(appointment.status, new_status)?;
        Self::authorize(actor, &appointment, new_status)?;

        let updated = self
            .store
            .update_status(appointment_id, new_status, notes, Utc::now(), auth_token)
            .await?;

        info!(
            "Appointment {} status changed {} -> {}",
            appointment_id, appointment.status, new_status
        );

        let notifier = Arc::clone(&self.notifier);
        let notice = updated.to_notice();
        tokio::spawn(async move {
            notifier
                .notify_status_changed(&notice, &new_status.to_string())
                .await;
        });

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime};
    use notification_cell::NoopDispatcher;

    use crate::services::store::MockAppointmentStore;

    const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Rejected,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    fn test_user(id: Uuid, role: &str) -> User {
        User {
            id: id.to_string(),
            email: Some("user@example.com".to_string()),
            role: Some(role.to_string()),
            metadata: None,
            created_at: None,
        }
    }

    fn appointment(doctor_id: Uuid, patient_id: Uuid, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            doctor_name: "Dr. Adams".to_string(),
            patient_name: "Jo Bloggs".to_string(),
            patient_email: "jo@example.com".to_string(),
            patient_phone: None,
            date: NaiveDate::from_ymd_opt(2025, 10, 25).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            reason: None,
            status,
            status_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service_returning(apt: Appointment, expect_update: bool) -> LifecycleService {
        let mut store = MockAppointmentStore::new();
        let fetched = apt.clone();
        store
            .expect_get_appointment()
            .returning(move |_, _| Ok(fetched.clone()));
        if expect_update {
            store
                .expect_update_status()
                .times(1)
                .returning(move |_, status, notes, updated_at, _| {
                    let mut updated = apt.clone();
                    updated.status = status;
                    updated.status_notes = notes;
                    updated.updated_at = updated_at;
                    Ok(updated)
                });
        } else {
            store.expect_update_status().times(0);
        }
        LifecycleService::with_parts(Arc::new(store), Arc::new(NoopDispatcher))
    }

    #[test]
    fn transition_table_is_exactly_the_contract() {
        use AppointmentStatus::*;
        let allowed = |from: AppointmentStatus, to: AppointmentStatus| {
            LifecycleService::validate_transition(from, to).is_ok()
        };

        for from in ALL {
            for to in ALL {
                let expected = matches!(
                    (from, to),
                    (Pending, Approved)
                        | (Pending, Rejected)
                        | (Pending, Cancelled)
                        | (Approved, Completed)
                        | (Approved, Cancelled)
                );
                assert_eq!(
                    allowed(from, to),
                    expected,
                    "transition {} -> {} mismatch",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for from in [
            AppointmentStatus::Rejected,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ] {
            assert!(LifecycleService::valid_transitions(from).is_empty());
        }
    }

    #[tokio::test]
    async fn doctor_approves_pending_appointment() {
        let doctor_id = Uuid::new_v4();
        let apt = appointment(doctor_id, Uuid::new_v4(), AppointmentStatus::Pending);
        let id = apt.id;
        let svc = service_returning(apt, true);

        let updated = svc
            .change_status(
                id,
                AppointmentStatus::Approved,
                None,
                &test_user(doctor_id, "doctor"),
                "token",
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Approved);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn patient_cannot_approve() {
        let patient_id = Uuid::new_v4();
        let apt = appointment(Uuid::new_v4(), patient_id, AppointmentStatus::Pending);
        let id = apt.id;
        let svc = service_returning(apt, false);

        let err = svc
            .change_status(
                id,
                AppointmentStatus::Approved,
                None,
                &test_user(patient_id, "patient"),
                "token",
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppointmentError::NotAuthorized(_));
    }

    #[tokio::test]
    async fn another_doctor_cannot_approve() {
        let apt = appointment(Uuid::new_v4(), Uuid::new_v4(), AppointmentStatus::Pending);
        let id = apt.id;
        let svc = service_returning(apt, false);

        let err = svc
            .change_status(
                id,
                AppointmentStatus::Approved,
                None,
                &test_user(Uuid::new_v4(), "doctor"),
                "token",
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppointmentError::NotAuthorized(_));
    }

    #[tokio::test]
    async fn patient_withdraws_pending_appointment() {
        let patient_id = Uuid::new_v4();
        let apt = appointment(Uuid::new_v4(), patient_id, AppointmentStatus::Pending);
        let id = apt.id;
        let svc = service_returning(apt, true);

        let updated = svc
            .change_status(
                id,
                AppointmentStatus::Cancelled,
                Some("Can no longer attend".to_string()),
                &test_user(patient_id, "patient"),
                "token",
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Cancelled);
        assert_eq!(updated.status_notes.as_deref(), Some("Can no longer attend"));
    }

    #[tokio::test]
    async fn doctor_cannot_cancel_pending_appointment() {
        // Only the patient may withdraw a pending request.
        let doctor_id = Uuid::new_v4();
        let apt = appointment(doctor_id, Uuid::new_v4(), AppointmentStatus::Pending);
        let id = apt.id;
        let svc = service_returning(apt, false);

        let err = svc
            .change_status(
                id,
                AppointmentStatus::Cancelled,
                None,
                &test_user(doctor_id, "doctor"),
                "token",
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppointmentError::NotAuthorized(_));
    }

    #[tokio::test]
    async fn either_side_cancels_approved_appointment() {
        let doctor_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();

        for (actor_id, role) in [(doctor_id, "doctor"), (patient_id, "patient")] {
            let apt = appointment(doctor_id, patient_id, AppointmentStatus::Approved);
            let id = apt.id;
            let svc = service_returning(apt, true);

            let updated = svc
                .change_status(
                    id,
                    AppointmentStatus::Cancelled,
                    None,
                    &test_user(actor_id, role),
                    "token",
                )
                .await
                .unwrap();
            assert_eq!(updated.status, AppointmentStatus::Cancelled);
        }
    }

    #[tokio::test]
    async fn pending_cannot_skip_to_completed() {
        let doctor_id = Uuid::new_v4();
        let apt = appointment(doctor_id, Uuid::new_v4(), AppointmentStatus::Pending);
        let id = apt.id;
        let svc = service_returning(apt, false);

        let err = svc
            .change_status(
                id,
                AppointmentStatus::Completed,
                None,
                &test_user(doctor_id, "doctor"),
                "token",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppointmentError::InvalidTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::Completed,
            }
        ));
    }

    #[tokio::test]
    async fn terminal_appointment_rejects_every_mutation() {
        let doctor_id = Uuid::new_v4();
        for terminal in [
            AppointmentStatus::Rejected,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ] {
            let apt = appointment(doctor_id, Uuid::new_v4(), terminal);
            let id = apt.id;
            let svc = service_returning(apt, false);

            let err = svc
                .change_status(
                    id,
                    AppointmentStatus::Approved,
                    None,
                    &test_user(doctor_id, "doctor"),
                    "token",
                )
                .await
                .unwrap_err();
            assert_matches!(err, AppointmentError::InvalidTransition { .. });
        }
    }
}
