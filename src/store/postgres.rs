// src/store/postgres.rs

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AppointmentStore, PatientStore, StoreError, StoreResult};
use crate::models::{Appointment, AppointmentStatus, Patient};

macro_rules! patient_columns {
    () => {
        "id, first_name, last_name, email, phone, date_of_birth, gender, address, \
         emergency_contact, emergency_phone, blood_group, allergies, medical_history, \
         created_at, updated_at"
    };
}

macro_rules! appointment_columns {
    () => {
        "id, patient_id, doctor_name, department, appointment_date_time, appointment_type, \
         status, symptoms, notes, prescription, diagnosis, fee, room_number, \
         created_at, updated_at"
    };
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Constraint violations surface as store errors the services can map.
fn db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::MissingReference(db.constraint().unwrap_or("foreign key").to_string());
        }
    }
    StoreError::Database(e)
}

/// `%term%` for ILIKE with the term's own wildcards matched literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/* ============================================================
   Patients
   ============================================================ */

#[async_trait]
impl PatientStore for PgStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        sqlx::query_as::<_, Patient>(concat!("SELECT ", patient_columns!(), " FROM patient WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error)
    }

    async fn find_all(&self) -> StoreResult<Vec<Patient>> {
        sqlx::query_as::<_, Patient>(concat!(
            "SELECT ", patient_columns!(), " FROM patient ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Patient>> {
        sqlx::query_as::<_, Patient>(concat!("SELECT ", patient_columns!(), " FROM patient WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error)
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>> {
        sqlx::query_as::<_, Patient>(concat!("SELECT ", patient_columns!(), " FROM patient WHERE phone = $1"))
            .bind(phone)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error)
    }

    async fn search_by_name(&self, name: &str) -> StoreResult<Vec<Patient>> {
        let like = contains_pattern(name);

        sqlx::query_as::<_, Patient>(concat!(
            "SELECT ", patient_columns!(), r#"
            FROM patient
            WHERE (first_name || ' ' || last_name) ILIKE $1 ESCAPE '\'
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(like)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_gender(&self, gender: &str) -> StoreResult<Vec<Patient>> {
        sqlx::query_as::<_, Patient>(concat!(
            "SELECT ", patient_columns!(), " FROM patient WHERE gender = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(gender)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_blood_group(&self, blood_group: &str) -> StoreResult<Vec<Patient>> {
        sqlx::query_as::<_, Patient>(concat!(
            "SELECT ", patient_columns!(), " FROM patient WHERE blood_group = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(blood_group)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn registered_since(&self, since: NaiveDateTime) -> StoreResult<Vec<Patient>> {
        sqlx::query_as::<_, Patient>(concat!(
            "SELECT ", patient_columns!(), " FROM patient WHERE created_at >= $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(since)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn save(&self, patient: Patient) -> StoreResult<Patient> {
        sqlx::query_as::<_, Patient>(concat!(
            r#"
            INSERT INTO patient (
              id, first_name, last_name, email, phone, date_of_birth, gender, address,
              emergency_contact, emergency_phone, blood_group, allergies, medical_history,
              created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
            ON CONFLICT (id) DO UPDATE SET
              first_name        = EXCLUDED.first_name,
              last_name         = EXCLUDED.last_name,
              email             = EXCLUDED.email,
              phone             = EXCLUDED.phone,
              date_of_birth     = EXCLUDED.date_of_birth,
              gender            = EXCLUDED.gender,
              address           = EXCLUDED.address,
              emergency_contact = EXCLUDED.emergency_contact,
              emergency_phone   = EXCLUDED.emergency_phone,
              blood_group       = EXCLUDED.blood_group,
              allergies         = EXCLUDED.allergies,
              medical_history   = EXCLUDED.medical_history,
              updated_at        = EXCLUDED.updated_at
            RETURNING "#,
            patient_columns!()
        ))
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(&patient.email)
        .bind(&patient.phone)
        .bind(patient.date_of_birth)
        .bind(&patient.gender)
        .bind(&patient.address)
        .bind(&patient.emergency_contact)
        .bind(&patient.emergency_phone)
        .bind(&patient.blood_group)
        .bind(&patient.allergies)
        .bind(&patient.medical_history)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(db_error)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        // appointment.patient_id cascades
        let res = sqlx::query("DELETE FROM patient WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM patient")
            .fetch_one(&self.db)
            .await
            .map_err(db_error)
    }

    async fn count_by_gender(&self, gender: &str) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM patient WHERE gender = $1")
            .bind(gender)
            .fetch_one(&self.db)
            .await
            .map_err(db_error)
    }
}

/* ============================================================
   Appointments
   ============================================================ */

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), " FROM appointment WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_all(&self) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), " FROM appointment ORDER BY appointment_date_time ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_patient(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE patient_id = $1
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(patient_id)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_doctor(&self, doctor_name: &str) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE doctor_name = $1
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(doctor_name)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_department(&self, department: &str) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE department = $1
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(department)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_status(&self, status: AppointmentStatus) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE status = $1
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE appointment_date_time >= $1
              AND appointment_date_time <= $2
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_by_doctor_and_time_range(
        &self,
        doctor_name: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE doctor_name = $1
              AND appointment_date_time >= $2
              AND appointment_date_time <= $3
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(doctor_name)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_between_with_status(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        statuses: &[AppointmentStatus],
    ) -> StoreResult<Vec<Appointment>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE appointment_date_time >= $1
              AND appointment_date_time <= $2
              AND status = ANY($3)
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(start)
        .bind(end)
        .bind(statuses)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn find_overdue(&self, now: NaiveDateTime) -> StoreResult<Vec<Appointment>> {
        sqlx::query_as::<_, Appointment>(concat!(
            "SELECT ", appointment_columns!(), r#"
            FROM appointment
            WHERE appointment_date_time < $1
              AND status IN ('SCHEDULED', 'CONFIRMED')
            ORDER BY appointment_date_time ASC, id ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)
    }

    async fn doctor_names(&self) -> StoreResult<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT doctor_name FROM appointment ORDER BY doctor_name")
            .fetch_all(&self.db)
            .await
            .map_err(db_error)
    }

    async fn departments(&self) -> StoreResult<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT department FROM appointment ORDER BY department")
            .fetch_all(&self.db)
            .await
            .map_err(db_error)
    }

    async fn save(&self, appointment: Appointment) -> StoreResult<Appointment> {
        sqlx::query_as::<_, Appointment>(concat!(
            r#"
            INSERT INTO appointment (
              id, patient_id, doctor_name, department, appointment_date_time, appointment_type,
              status, symptoms, notes, prescription, diagnosis, fee, room_number,
              created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
            ON CONFLICT (id) DO UPDATE SET
              patient_id            = EXCLUDED.patient_id,
              doctor_name           = EXCLUDED.doctor_name,
              department            = EXCLUDED.department,
              appointment_date_time = EXCLUDED.appointment_date_time,
              appointment_type      = EXCLUDED.appointment_type,
              status                = EXCLUDED.status,
              symptoms              = EXCLUDED.symptoms,
              notes                 = EXCLUDED.notes,
              prescription          = EXCLUDED.prescription,
              diagnosis             = EXCLUDED.diagnosis,
              fee                   = EXCLUDED.fee,
              room_number           = EXCLUDED.room_number,
              updated_at            = EXCLUDED.updated_at
            RETURNING "#,
            appointment_columns!()
        ))
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(&appointment.doctor_name)
        .bind(&appointment.department)
        .bind(appointment.appointment_date_time)
        .bind(&appointment.appointment_type)
        .bind(appointment.status.as_str())
        .bind(&appointment.symptoms)
        .bind(&appointment.notes)
        .bind(&appointment.prescription)
        .bind(&appointment.diagnosis)
        .bind(appointment.fee)
        .bind(&appointment.room_number)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(db_error)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM appointment WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM appointment")
            .fetch_one(&self.db)
            .await
            .map_err(db_error)
    }

    async fn count_by_status(&self, status: AppointmentStatus) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM appointment WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(db_error)
    }
}
