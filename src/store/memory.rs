// src/store/memory.rs

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AppointmentStore, PatientStore, StoreError, StoreResult};
use crate::models::{Appointment, AppointmentStatus, Patient};

/// Process-local store. Used when no database is configured, and by tests.
/// Enforces the same unique and reference constraints as the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    patients: HashMap<Uuid, Patient>,
    appointments: HashMap<Uuid, Appointment>,
}

impl Tables {
    fn patients_where(&self, keep: impl Fn(&Patient) -> bool) -> Vec<Patient> {
        let mut out: Vec<Patient> = self.patients.values().filter(|&p| keep(p)).cloned().collect();
        out.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        out
    }

    fn appointments_where(&self, keep: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        let mut out: Vec<Appointment> =
            self.appointments.values().filter(|&a| keep(a)).cloned().collect();
        out.sort_by(|a, b| {
            (a.appointment_date_time, a.id).cmp(&(b.appointment_date_time, b.id))
        });
        out
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.tables.read().await.patients_where(|_| true))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables.patients.values().find(|p| p.email == email).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables.patients.values().find(|p| p.phone == phone).cloned())
    }

    async fn search_by_name(&self, name: &str) -> StoreResult<Vec<Patient>> {
        let needle = name.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .patients_where(|p| p.full_name().to_lowercase().contains(&needle)))
    }

    async fn find_by_gender(&self, gender: &str) -> StoreResult<Vec<Patient>> {
        Ok(self.tables.read().await.patients_where(|p| p.gender == gender))
    }

    async fn find_by_blood_group(&self, blood_group: &str) -> StoreResult<Vec<Patient>> {
        Ok(self
            .tables
            .read()
            .await
            .patients_where(|p| p.blood_group.as_deref() == Some(blood_group)))
    }

    async fn registered_since(&self, since: NaiveDateTime) -> StoreResult<Vec<Patient>> {
        Ok(self.tables.read().await.patients_where(|p| p.created_at >= since))
    }

    async fn save(&self, patient: Patient) -> StoreResult<Patient> {
        let mut tables = self.tables.write().await;

        let clash = tables
            .patients
            .values()
            .filter(|p| p.id != patient.id)
            .find_map(|p| {
                if p.email == patient.email {
                    Some(format!("email {}", patient.email))
                } else if p.phone == patient.phone {
                    Some(format!("phone {}", patient.phone))
                } else {
                    None
                }
            });
        if let Some(what) = clash {
            return Err(StoreError::Duplicate(what));
        }

        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.patients.remove(&id).is_none() {
            return Ok(false);
        }
        tables.appointments.retain(|_, a| a.patient_id != id);
        Ok(true)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.patients.len() as i64)
    }

    async fn count_by_gender(&self, gender: &str) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.patients.values().filter(|p| p.gender == gender).count() as i64)
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Appointment>> {
        Ok(self.tables.read().await.appointments_where(|_| true))
    }

    async fn find_by_patient(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>> {
        Ok(self
            .tables
            .read()
            .await
            .appointments_where(|a| a.patient_id == patient_id))
    }

    async fn find_by_doctor(&self, doctor_name: &str) -> StoreResult<Vec<Appointment>> {
        Ok(self
            .tables
            .read()
            .await
            .appointments_where(|a| a.doctor_name == doctor_name))
    }

    async fn find_by_department(&self, department: &str) -> StoreResult<Vec<Appointment>> {
        Ok(self
            .tables
            .read()
            .await
            .appointments_where(|a| a.department == department))
    }

    async fn find_by_status(&self, status: AppointmentStatus) -> StoreResult<Vec<Appointment>> {
        Ok(self.tables.read().await.appointments_where(|a| a.status == status))
    }

    async fn find_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        Ok(self.tables.read().await.appointments_where(|a| {
            a.appointment_date_time >= start && a.appointment_date_time <= end
        }))
    }

    async fn find_by_doctor_and_time_range(
        &self,
        doctor_name: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        Ok(self.tables.read().await.appointments_where(|a| {
            a.doctor_name == doctor_name
                && a.appointment_date_time >= start
                && a.appointment_date_time <= end
        }))
    }

    async fn find_between_with_status(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        statuses: &[AppointmentStatus],
    ) -> StoreResult<Vec<Appointment>> {
        Ok(self.tables.read().await.appointments_where(|a| {
            a.appointment_date_time >= start
                && a.appointment_date_time <= end
                && statuses.contains(&a.status)
        }))
    }

    async fn find_overdue(&self, now: NaiveDateTime) -> StoreResult<Vec<Appointment>> {
        Ok(self
            .tables
            .read()
            .await
            .appointments_where(|a| a.appointment_date_time < now && a.is_active()))
    }

    async fn doctor_names(&self) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        let names: BTreeSet<&String> = tables.appointments.values().map(|a| &a.doctor_name).collect();
        Ok(names.into_iter().cloned().collect())
    }

    async fn departments(&self) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        let names: BTreeSet<&String> = tables.appointments.values().map(|a| &a.department).collect();
        Ok(names.into_iter().cloned().collect())
    }

    async fn save(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;
        if !tables.patients.contains_key(&appointment.patient_id) {
            return Err(StoreError::MissingReference(format!(
                "patient {}",
                appointment.patient_id
            )));
        }
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.appointments.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.appointments.len() as i64)
    }

    async fn count_by_status(&self, status: AppointmentStatus) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.values().filter(|a| a.status == status).count() as i64)
    }
}
