// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{
    parse_date, AppointmentError, BookAppointmentRequest, CheckAvailabilityRequest, SlotRef,
    StatusUpdateRequest,
};
use crate::services::booking::BookingService;
use crate::services::lifecycle::LifecycleService;

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: String,
}

fn caller_id(user: &User) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppointmentError::Validation("Invalid user id".to_string()))
}

/// GET /available-slots/{doctor_id}?date=YYYY-MM-DD
#[axum::debug_handler]
pub async fn available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppointmentError> {
    let date = parse_date(&query.date)?;

    let service = BookingService::new(&state);
    let slots = service
        .available_slots(doctor_id, date, auth.token())
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
    })))
}

/// POST /check-availability
#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CheckAvailabilityRequest>,
) -> Result<Json<Value>, AppointmentError> {
    let slot = SlotRef::parse(&request.appointment_date, &request.appointment_time)?;

    let service = BookingService::new(&state);
    let conflicts = service
        .check_availability(request.doctor_id, slot, auth.token())
        .await?;

    Ok(Json(json!({
        "available": conflicts.is_empty(),
        "conflicts": conflicts,
    })))
}

/// POST / - book an appointment for the authenticated patient.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppointmentError> {
    let patient_id = caller_id(&user)?;

    let service = BookingService::new(&state);
    let appointment = service.book(request, patient_id, auth.token()).await?;

    Ok(Json(json!({
        "message": "Appointment booked successfully",
        "appointment": appointment,
    })))
}

/// GET /my-appointments - the caller's own appointments, either side.
#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    let service = BookingService::new(&state);
    let appointments = service.appointments_for_user(&user, auth.token()).await?;

    Ok(Json(json!({ "appointments": appointments })))
}

/// GET /{appointment_id} - participants (or admin) only.
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppointmentError> {
    let user_id = caller_id(&user)?;

    let service = BookingService::new(&state);
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;

    let is_participant = appointment.doctor_id == user_id || appointment.patient_id == user_id;
    if !is_participant && !user.is_admin() {
        return Err(AppointmentError::NotAuthorized(
            "Only participants may view this appointment".to_string(),
        ));
    }

    Ok(Json(json!({ "appointment": appointment })))
}

/// PUT /{appointment_id}/status
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppointmentError> {
    let service = LifecycleService::new(&state);
    let appointment = service
        .change_status(
            appointment_id,
            request.status,
            request.notes,
            &user,
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "message": "Appointment status updated",
        "appointment": appointment,
    })))
}
