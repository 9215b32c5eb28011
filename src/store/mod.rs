// src/store/mod.rs
//
// Persistence seams. Services only ever see these traits; records are
// linked by id and resolved on demand.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, Patient};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique column (patient email or phone) already holds the value.
    #[error("duplicate value: {0}")]
    Duplicate(String),
    #[error("missing reference: {0}")]
    MissingReference(String),
    #[error("db error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Patient>>;
    async fn find_all(&self) -> StoreResult<Vec<Patient>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Patient>>;
    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>>;
    /// Case-insensitive substring match on "first last".
    async fn search_by_name(&self, name: &str) -> StoreResult<Vec<Patient>>;
    async fn find_by_gender(&self, gender: &str) -> StoreResult<Vec<Patient>>;
    async fn find_by_blood_group(&self, blood_group: &str) -> StoreResult<Vec<Patient>>;
    async fn registered_since(&self, since: NaiveDateTime) -> StoreResult<Vec<Patient>>;
    /// Insert or replace by id.
    async fn save(&self, patient: Patient) -> StoreResult<Patient>;
    /// Also removes the patient's appointments. Returns false when absent.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
    async fn count(&self) -> StoreResult<i64>;
    async fn count_by_gender(&self, gender: &str) -> StoreResult<i64>;
}

/// Every list comes back ordered by appointment date-time.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn find_all(&self) -> StoreResult<Vec<Appointment>>;
    async fn find_by_patient(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>>;
    async fn find_by_doctor(&self, doctor_name: &str) -> StoreResult<Vec<Appointment>>;
    async fn find_by_department(&self, department: &str) -> StoreResult<Vec<Appointment>>;
    async fn find_by_status(&self, status: AppointmentStatus) -> StoreResult<Vec<Appointment>>;
    /// Inclusive on both ends.
    async fn find_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>>;
    /// Inclusive on both ends, any status.
    async fn find_by_doctor_and_time_range(
        &self,
        doctor_name: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>>;
    async fn find_between_with_status(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        statuses: &[AppointmentStatus],
    ) -> StoreResult<Vec<Appointment>>;
    /// Active appointments whose date-time is before `now`.
    async fn find_overdue(&self, now: NaiveDateTime) -> StoreResult<Vec<Appointment>>;
    async fn doctor_names(&self) -> StoreResult<Vec<String>>;
    async fn departments(&self) -> StoreResult<Vec<String>>;
    /// Insert or replace by id. The referenced patient must exist.
    async fn save(&self, appointment: Appointment) -> StoreResult<Appointment>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
    async fn count(&self) -> StoreResult<i64>;
    async fn count_by_status(&self, status: AppointmentStatus) -> StoreResult<i64>;
}
