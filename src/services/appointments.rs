// src/services/appointments.rs
//
// Appointment booking and the doctor double-booking guard.

use std::sync::Arc;

use chrono::{Duration, Months, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ServiceError, ServiceResult, max_len, optional, required};
use crate::{
    clock::Clock,
    models::{Appointment, AppointmentRequest, AppointmentStatus, datetime_format},
    store::{AppointmentStore, PatientStore},
};

/// Half-width of the window an active appointment holds for its doctor.
pub const CONFLICT_WINDOW_MINUTES: i64 = 30;

/// How far ahead `upcoming()` looks.
pub const UPCOMING_HORIZON_MONTHS: u32 = 3;

const DOCTOR_NAME_MAX: usize = 100;
const DEPARTMENT_MAX: usize = 100;
const SYMPTOMS_MAX: usize = 1000;
const NOTES_MAX: usize = 1000;
const PRESCRIPTION_MAX: usize = 2000;
const DIAGNOSIS_MAX: usize = 1000;

/// A candidate that passed `validate`: required fields present and
/// trimmed, date-time in the future.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidAppointment {
    pub patient_id: Uuid,
    pub doctor_name: String,
    pub department: String,
    pub appointment_date_time: NaiveDateTime,
    pub appointment_type: String,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub diagnosis: Option<String>,
    pub fee: Option<f64>,
    pub room_number: Option<String>,
}

impl Appointment {
    fn apply(&mut self, valid: ValidAppointment) {
        self.patient_id = valid.patient_id;
        self.doctor_name = valid.doctor_name;
        self.department = valid.department;
        self.appointment_date_time = valid.appointment_date_time;
        self.appointment_type = valid.appointment_type;
        self.symptoms = valid.symptoms;
        self.notes = valid.notes;
        self.prescription = valid.prescription;
        self.diagnosis = valid.diagnosis;
        self.fee = valid.fee;
        self.room_number = valid.room_number;
    }
}

#[derive(Clone)]
pub struct AppointmentService {
    appointments: Arc<dyn AppointmentStore>,
    patients: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
}

impl AppointmentService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        patients: Arc<dyn PatientStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            patients,
            clock,
        }
    }

    /* ============================================================
       Scheduling guard
       ============================================================ */

    pub fn validate(&self, candidate: &AppointmentRequest) -> ServiceResult<ValidAppointment> {
        let patient_id = candidate
            .patient_id
            .ok_or_else(|| ServiceError::Validation("Patient is required".into()))?;
        let doctor_name = required(candidate.doctor_name.as_deref(), "Doctor name")?;
        let department = required(candidate.department.as_deref(), "Department")?;

        let appointment_date_time = candidate.appointment_date_time.ok_or_else(|| {
            ServiceError::Validation("Appointment date and time is required".into())
        })?;
        if appointment_date_time <= self.clock.now() {
            return Err(ServiceError::Validation(
                "Appointment must be scheduled for a future date and time".into(),
            ));
        }

        let appointment_type = required(candidate.appointment_type.as_deref(), "Appointment type")?;

        let valid = ValidAppointment {
            patient_id,
            doctor_name,
            department,
            appointment_date_time,
            appointment_type,
            symptoms: optional(candidate.symptoms.as_deref()),
            notes: optional(candidate.notes.as_deref()),
            prescription: optional(candidate.prescription.as_deref()),
            diagnosis: optional(candidate.diagnosis.as_deref()),
            fee: candidate.fee,
            room_number: optional(candidate.room_number.as_deref()),
        };

        max_len(Some(&valid.doctor_name), DOCTOR_NAME_MAX, "Doctor name")?;
        max_len(Some(&valid.department), DEPARTMENT_MAX, "Department")?;
        max_len(valid.symptoms.as_deref(), SYMPTOMS_MAX, "Symptoms")?;
        max_len(valid.notes.as_deref(), NOTES_MAX, "Notes")?;
        max_len(valid.prescription.as_deref(), PRESCRIPTION_MAX, "Prescription")?;
        max_len(valid.diagnosis.as_deref(), DIAGNOSIS_MAX, "Diagnosis")?;

        Ok(valid)
    }

    /// Fails when another active appointment of the same doctor sits
    /// less than the conflict window away from `date_time`.
    pub async fn check_availability(
        &self,
        doctor_name: &str,
        date_time: NaiveDateTime,
        excluding: Option<Uuid>,
    ) -> ServiceResult<()> {
        let window = Duration::minutes(CONFLICT_WINDOW_MINUTES);

        debug!(doctor = doctor_name, %date_time, "checking doctor availability");

        let (Some(from), Some(to)) = (
            date_time.checked_sub_signed(window),
            date_time.checked_add_signed(window),
        ) else {
            return Err(ServiceError::Validation(
                "Appointment date and time is out of range".into(),
            ));
        };

        let nearby = self
            .appointments
            .find_by_doctor_and_time_range(doctor_name, from, to)
            .await?;

        let conflicts = nearby
            .iter()
            .filter(|a| a.is_active())
            .filter(|a| Some(a.id) != excluding)
            .filter(|a| {
                let gap = a.appointment_date_time - date_time;
                gap > -window && gap < window
            })
            .count();

        if conflicts > 0 {
            warn!(doctor = doctor_name, %date_time, conflicts, "doctor double-booking rejected");
            return Err(ServiceError::Conflict(format!(
                "Doctor {doctor_name} is not available at {}",
                date_time.format(datetime_format::FORMAT)
            )));
        }
        Ok(())
    }

    pub async fn create_appointment(&self, candidate: AppointmentRequest) -> ServiceResult<Appointment> {
        let patient_id = candidate
            .patient_id
            .ok_or_else(|| ServiceError::Validation("Patient is required".into()))?;
        self.resolve_patient(patient_id).await?;

        let valid = self.validate(&candidate)?;
        self.check_availability(&valid.doctor_name, valid.appointment_date_time, None)
            .await?;

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: valid.patient_id,
            doctor_name: valid.doctor_name,
            department: valid.department,
            appointment_date_time: valid.appointment_date_time,
            appointment_type: valid.appointment_type,
            status: AppointmentStatus::Scheduled,
            symptoms: valid.symptoms,
            notes: valid.notes,
            prescription: valid.prescription,
            diagnosis: valid.diagnosis,
            fee: valid.fee,
            room_number: valid.room_number,
            created_at: now,
            updated_at: now,
        };

        let saved = self.appointments.save(appointment).await?;
        info!(
            appointment_id = %saved.id,
            patient_id = %saved.patient_id,
            doctor = %saved.doctor_name,
            at = %saved.appointment_date_time,
            "appointment scheduled"
        );
        Ok(saved)
    }

    /// Availability is re-checked only when the doctor or the time moves;
    /// the appointment never conflicts with itself.
    pub async fn update_appointment(
        &self,
        id: Uuid,
        candidate: AppointmentRequest,
    ) -> ServiceResult<Appointment> {
        let mut existing = self.get(id).await?;

        let patient_id = candidate
            .patient_id
            .ok_or_else(|| ServiceError::Validation("Patient is required".into()))?;
        self.resolve_patient(patient_id).await?;

        let valid = self.validate(&candidate)?;
        if existing.doctor_name != valid.doctor_name
            || existing.appointment_date_time != valid.appointment_date_time
        {
            self.check_availability(&valid.doctor_name, valid.appointment_date_time, Some(id))
                .await?;
        }

        existing.apply(valid);
        if let Some(status) = candidate.status {
            existing.status = status;
        }
        existing.updated_at = self.clock.now();

        let saved = self.appointments.save(existing).await?;
        info!(appointment_id = %saved.id, status = %saved.status, "appointment updated");
        Ok(saved)
    }

    pub async fn cancel(&self, id: Uuid) -> ServiceResult<Appointment> {
        let mut appointment = self.get(id).await?;

        let now = self.clock.now();
        if !appointment.can_be_cancelled(now) {
            return Err(ServiceError::Conflict(format!(
                "Appointment cannot be cancelled (status {}, at {})",
                appointment.status,
                appointment.appointment_date_time.format(datetime_format::FORMAT)
            )));
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = now;

        let saved = self.appointments.save(appointment).await?;
        info!(appointment_id = %saved.id, "appointment cancelled");
        Ok(saved)
    }

    async fn resolve_patient(&self, patient_id: Uuid) -> ServiceResult<()> {
        match self.patients.find(patient_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!(
                "Patient not found with id: {patient_id}"
            ))),
        }
    }

    /* ============================================================
       Reads and maintenance
       ============================================================ */

    pub async fn get(&self, id: Uuid) -> ServiceResult<Appointment> {
        self.appointments
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Appointment not found with id: {id}")))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Appointment>> {
        Ok(self.appointments.find_all().await?)
    }

    pub async fn by_patient(&self, patient_id: Uuid) -> ServiceResult<Vec<Appointment>> {
        Ok(self.appointments.find_by_patient(patient_id).await?)
    }

    pub async fn by_doctor(&self, doctor_name: &str) -> ServiceResult<Vec<Appointment>> {
        Ok(self.appointments.find_by_doctor(doctor_name.trim()).await?)
    }

    pub async fn by_department(&self, department: &str) -> ServiceResult<Vec<Appointment>> {
        Ok(self.appointments.find_by_department(department.trim()).await?)
    }

    pub async fn by_status(&self, status: AppointmentStatus) -> ServiceResult<Vec<Appointment>> {
        Ok(self.appointments.find_by_status(status).await?)
    }

    pub async fn between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> ServiceResult<Vec<Appointment>> {
        if start > end {
            return Err(ServiceError::Validation("start must not be after end".into()));
        }
        Ok(self.appointments.find_between(start, end).await?)
    }

    /// Active appointments from now until the upcoming horizon.
    pub async fn upcoming(&self) -> ServiceResult<Vec<Appointment>> {
        let now = self.clock.now();
        let until = now
            .checked_add_months(Months::new(UPCOMING_HORIZON_MONTHS))
            .unwrap_or(NaiveDateTime::MAX);

        let found = self
            .appointments
            .find_between_with_status(now, until, &AppointmentStatus::ACTIVE)
            .await?;

        Ok(found.into_iter().filter(|a| a.is_upcoming(now)).collect())
    }

    pub async fn today(&self) -> ServiceResult<Vec<Appointment>> {
        let start = self.clock.now().date().and_time(NaiveTime::MIN);
        // last representable instant of the day; sub-second times count as today
        let end = start + Duration::days(1) - Duration::nanoseconds(1);

        Ok(self.appointments.find_between(start, end).await?)
    }

    pub async fn overdue(&self) -> ServiceResult<Vec<Appointment>> {
        Ok(self.appointments.find_overdue(self.clock.now()).await?)
    }

    pub async fn doctors(&self) -> ServiceResult<Vec<String>> {
        Ok(self.appointments.doctor_names().await?)
    }

    pub async fn departments(&self) -> ServiceResult<Vec<String>> {
        Ok(self.appointments.departments().await?)
    }

    /// Caller-driven; any status may follow any other.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> ServiceResult<Appointment> {
        let mut appointment = self.get(id).await?;
        let previous = appointment.status;
        appointment.status = status;
        appointment.updated_at = self.clock.now();

        let saved = self.appointments.save(appointment).await?;
        info!(appointment_id = %saved.id, from = %previous, to = %status, "appointment status changed");
        Ok(saved)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        if !self.appointments.delete(id).await? {
            return Err(ServiceError::NotFound(format!(
                "Appointment not found with id: {id}"
            )));
        }
        info!(appointment_id = %id, "appointment deleted");
        Ok(())
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.appointments.count().await?)
    }

    pub async fn count_by_status(&self, status: AppointmentStatus) -> ServiceResult<i64> {
        Ok(self.appointments.count_by_status(status).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_utils::{TestApp, appointment_request, patient_request, test_app, ts};

    const NOW: &str = "2029-12-01 08:00:00";

    async fn with_patient(now: &str) -> (TestApp, Uuid) {
        let app = test_app(now);
        let patient = app.state.patients.create(patient_request("0001")).await.unwrap();
        (app, patient.id)
    }

    #[tokio::test]
    async fn validate_rejects_past_and_present_times() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;

        for at in ["2029-11-30 08:00:00", NOW] {
            let err = svc.validate(&appointment_request(pid, "Dr. Smith", at)).unwrap_err();
            assert_matches!(err, ServiceError::Validation(msg) if msg.contains("future"));
        }
        assert!(svc.validate(&appointment_request(pid, "Dr. Smith", "2029-12-01 08:00:01")).is_ok());
    }

    #[tokio::test]
    async fn validate_names_the_missing_field() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let base = appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00");

        let cases = [
            (AppointmentRequest { patient_id: None, ..base.clone() }, "Patient"),
            (AppointmentRequest { doctor_name: Some("  ".into()), ..base.clone() }, "Doctor name"),
            (AppointmentRequest { department: None, ..base.clone() }, "Department"),
            (AppointmentRequest { appointment_date_time: None, ..base.clone() }, "date and time"),
            (AppointmentRequest { appointment_type: Some(String::new()), ..base.clone() }, "Appointment type"),
            (AppointmentRequest { doctor_name: Some("x".repeat(101)), ..base.clone() }, "100 characters"),
        ];

        for (candidate, field) in cases {
            let err = svc.validate(&candidate).unwrap_err();
            assert_matches!(err, ServiceError::Validation(msg) if msg.contains(field), "{field}");
        }
    }

    #[tokio::test]
    async fn booking_scenario_respects_thirty_minute_window() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;

        let first = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();
        assert_eq!(first.status, AppointmentStatus::Scheduled);

        let clash = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:15:00"))
            .await
            .unwrap_err();
        assert_matches!(clash, ServiceError::Conflict(msg) if msg.contains("Dr. Smith"));

        let later = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 11:00:00"))
            .await
            .unwrap();
        assert_eq!(later.status, AppointmentStatus::Scheduled);
        assert_eq!(svc.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn window_edges_are_exclusive() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        svc.create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        for at in ["2030-01-01 09:30:01", "2030-01-01 10:29:59", "2030-01-01 10:00:00"] {
            let res = svc.check_availability("Dr. Smith", ts(at), None).await;
            assert_matches!(res, Err(ServiceError::Conflict(_)), "{at}");
        }
        for at in ["2030-01-01 09:30:00", "2030-01-01 10:30:00", "2030-01-01 12:00:00"] {
            assert!(svc.check_availability("Dr. Smith", ts(at), None).await.is_ok(), "{at}");
        }
    }

    #[tokio::test]
    async fn window_past_the_calendar_limit_is_a_validation_error() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let candidate = AppointmentRequest {
            appointment_date_time: Some(NaiveDateTime::MAX),
            ..appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00")
        };

        let err = svc.create_appointment(candidate).await.unwrap_err();

        assert_matches!(err, ServiceError::Validation(msg) if msg.contains("out of range"));
        assert_eq!(svc.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn inactive_appointments_do_not_block_the_window() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        svc.cancel(booked.id).await.unwrap();

        assert!(svc.check_availability("Dr. Smith", ts("2030-01-01 10:00:00"), None).await.is_ok());
    }

    #[tokio::test]
    async fn confirmed_appointments_still_block() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();
        svc.update_status(booked.id, AppointmentStatus::Confirmed).await.unwrap();

        let res = svc.check_availability("Dr. Smith", ts("2030-01-01 10:20:00"), None).await;
        assert_matches!(res, Err(ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_requires_known_patient() {
        let app = test_app(NOW);
        let err = app
            .state
            .appointments
            .create_appointment(appointment_request(Uuid::new_v4(), "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::NotFound(_));
    }

    #[tokio::test]
    async fn create_ignores_requested_status_and_stamps_times() {
        let (app, pid) = with_patient(NOW).await;
        let candidate = AppointmentRequest {
            status: Some(AppointmentStatus::Completed),
            symptoms: Some("  chest pain ".into()),
            notes: Some("   ".into()),
            ..appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00")
        };

        let created = app.state.appointments.create_appointment(candidate).await.unwrap();

        assert_eq!(created.status, AppointmentStatus::Scheduled);
        assert_eq!(created.symptoms.as_deref(), Some("chest pain"));
        assert_eq!(created.notes, None);
        assert_eq!(created.created_at, ts(NOW));
        assert_eq!(created.updated_at, ts(NOW));
    }

    #[tokio::test]
    async fn update_in_place_does_not_conflict_with_itself() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        app.clock.set("2029-12-02 09:00:00");
        let updated = svc
            .update_appointment(
                booked.id,
                AppointmentRequest {
                    diagnosis: Some("Arrhythmia".into()),
                    status: Some(AppointmentStatus::Confirmed),
                    ..appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00")
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, booked.id);
        assert_eq!(updated.status, AppointmentStatus::Confirmed);
        assert_eq!(updated.diagnosis.as_deref(), Some("Arrhythmia"));
        assert_eq!(updated.created_at, booked.created_at);
        assert_eq!(updated.updated_at, ts("2029-12-02 09:00:00"));
    }

    #[tokio::test]
    async fn moving_within_own_window_is_allowed() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        let moved = svc
            .update_appointment(booked.id, appointment_request(pid, "Dr. Smith", "2030-01-01 10:10:00"))
            .await
            .unwrap();

        assert_eq!(moved.appointment_date_time, ts("2030-01-01 10:10:00"));
    }

    #[tokio::test]
    async fn moving_into_another_booking_conflicts() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        svc.create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();
        let other = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 14:00:00"))
            .await
            .unwrap();

        let err = svc
            .update_appointment(other.id, appointment_request(pid, "Dr. Smith", "2030-01-01 10:20:00"))
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::Conflict(_));
        assert_eq!(svc.get(other.id).await.unwrap().appointment_date_time, ts("2030-01-01 14:00:00"));
    }

    #[tokio::test]
    async fn conflicts_are_per_doctor() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        svc.create_appointment(appointment_request(pid, "Dr. Jones", "2030-01-01 10:00:00"))
            .await
            .unwrap();
        let mine = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 14:00:00"))
            .await
            .unwrap();

        let moved = svc
            .update_appointment(mine.id, appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        assert_eq!(moved.appointment_date_time, ts("2030-01-01 10:00:00"));
    }

    #[tokio::test]
    async fn update_of_missing_appointment_is_not_found() {
        let (app, pid) = with_patient(NOW).await;
        let err = app
            .state
            .appointments
            .update_appointment(Uuid::new_v4(), appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::NotFound(_));
    }

    #[tokio::test]
    async fn cancelling_future_scheduled_appointment_succeeds() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        let cancelled = svc.cancel(booked.id).await.unwrap();

        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(svc.get(booked.id).await.unwrap().status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_past_appointment_conflicts() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        app.clock.set("2030-01-02 08:00:00");

        assert_matches!(svc.cancel(booked.id).await, Err(ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancelling_completed_appointment_conflicts() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();
        svc.update_status(booked.id, AppointmentStatus::Completed).await.unwrap();

        assert_matches!(svc.cancel(booked.id).await, Err(ServiceError::Conflict(_)));
        assert_matches!(svc.cancel(Uuid::new_v4()).await, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn derived_reads_filter_by_time_and_status() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let today = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2029-12-01 15:00:00"))
            .await
            .unwrap();
        let soon = svc
            .create_appointment(appointment_request(pid, "Dr. Jones", "2029-12-20 09:00:00"))
            .await
            .unwrap();
        let far = svc
            .create_appointment(appointment_request(pid, "Dr. Adams", "2030-06-01 09:00:00"))
            .await
            .unwrap();

        let ids = |list: Vec<Appointment>| list.into_iter().map(|a| a.id).collect::<Vec<_>>();

        assert_eq!(ids(svc.today().await.unwrap()), vec![today.id]);
        assert_eq!(ids(svc.upcoming().await.unwrap()), vec![today.id, soon.id]);
        assert_eq!(svc.doctors().await.unwrap(), vec!["Dr. Adams", "Dr. Jones", "Dr. Smith"]);
        assert_eq!(ids(svc.by_doctor("Dr. Adams").await.unwrap()), vec![far.id]);

        app.clock.set("2029-12-21 00:00:00");
        svc.update_status(soon.id, AppointmentStatus::Completed).await.unwrap();

        assert_eq!(ids(svc.overdue().await.unwrap()), vec![today.id]);
        assert_eq!(svc.count_by_status(AppointmentStatus::Scheduled).await.unwrap(), 2);
        assert_matches!(
            svc.between(ts("2030-01-02 00:00:00"), ts("2030-01-01 00:00:00")).await,
            Err(ServiceError::Validation(_))
        );
    }

    #[tokio::test]
    async fn today_includes_fractional_seconds_before_midnight() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let late = svc
            .create_appointment(AppointmentRequest {
                appointment_date_time: Some(ts("2029-12-01 23:59:59") + Duration::milliseconds(500)),
                ..appointment_request(pid, "Dr. Smith", "2029-12-01 23:59:59")
            })
            .await
            .unwrap();
        svc.create_appointment(appointment_request(pid, "Dr. Jones", "2029-12-02 00:00:00"))
            .await
            .unwrap();

        let today: Vec<_> = svc.today().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(today, vec![late.id]);
    }

    #[tokio::test]
    async fn delete_reports_missing_appointment() {
        let (app, pid) = with_patient(NOW).await;
        let svc = &app.state.appointments;
        let booked = svc
            .create_appointment(appointment_request(pid, "Dr. Smith", "2030-01-01 10:00:00"))
            .await
            .unwrap();

        svc.delete(booked.id).await.unwrap();

        assert_matches!(svc.delete(booked.id).await, Err(ServiceError::NotFound(_)));
        assert!(svc.by_patient(pid).await.unwrap().is_empty());
    }
}
