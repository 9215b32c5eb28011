// src/services/patients.rs

use std::sync::Arc;

use chrono::{Duration, NaiveTime};
use tracing::info;
use uuid::Uuid;

use super::{ServiceError, ServiceResult, optional, required};
use crate::{
    clock::Clock,
    models::{Patient, PatientRequest},
    store::PatientStore,
};

pub const DEFAULT_RECENT_DAYS: i64 = 30;

#[derive(Clone)]
pub struct PatientService {
    patients: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
}

/// Profile fields after validation; identity and timestamps are added by
/// the caller.
struct Profile {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    date_of_birth: chrono::NaiveDate,
    gender: String,
    address: Option<String>,
    emergency_contact: Option<String>,
    emergency_phone: Option<String>,
    blood_group: Option<String>,
    allergies: Option<String>,
    medical_history: Option<String>,
}

impl PatientService {
    pub fn new(patients: Arc<dyn PatientStore>, clock: Arc<dyn Clock>) -> Self {
        Self { patients, clock }
    }

    fn validate(&self, req: &PatientRequest) -> ServiceResult<Profile> {
        let first_name = required(req.first_name.as_deref(), "First name")?;
        let last_name = required(req.last_name.as_deref(), "Last name")?;
        let email = required(req.email.as_deref(), "Email")?;
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(ServiceError::Validation("Email should be valid".into())),
        }
        let phone = required(req.phone.as_deref(), "Phone")?;

        let date_of_birth = req
            .date_of_birth
            .ok_or_else(|| ServiceError::Validation("Date of birth is required".into()))?;
        if date_of_birth > self.clock.now().date() {
            return Err(ServiceError::Validation(
                "Date of birth cannot be in the future".into(),
            ));
        }

        let gender = required(req.gender.as_deref(), "Gender")?;

        Ok(Profile {
            first_name,
            last_name,
            email,
            phone,
            date_of_birth,
            gender,
            address: optional(req.address.as_deref()),
            emergency_contact: optional(req.emergency_contact.as_deref()),
            emergency_phone: optional(req.emergency_phone.as_deref()),
            blood_group: optional(req.blood_group.as_deref()),
            allergies: optional(req.allergies.as_deref()),
            medical_history: optional(req.medical_history.as_deref()),
        })
    }

    /// Email and phone must not belong to any patient other than `owner`.
    async fn ensure_contact_unique(&self, profile: &Profile, owner: Option<Uuid>) -> ServiceResult<()> {
        if let Some(other) = self.patients.find_by_email(&profile.email).await? {
            if Some(other.id) != owner {
                return Err(ServiceError::Conflict(format!(
                    "Patient with email {} already exists",
                    profile.email
                )));
            }
        }
        if let Some(other) = self.patients.find_by_phone(&profile.phone).await? {
            if Some(other.id) != owner {
                return Err(ServiceError::Conflict(format!(
                    "Patient with phone {} already exists",
                    profile.phone
                )));
            }
        }
        Ok(())
    }

    pub async fn create(&self, req: PatientRequest) -> ServiceResult<Patient> {
        let profile = self.validate(&req)?;
        self.ensure_contact_unique(&profile, None).await?;

        let now = self.clock.now();
        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            phone: profile.phone,
            date_of_birth: profile.date_of_birth,
            gender: profile.gender,
            address: profile.address,
            emergency_contact: profile.emergency_contact,
            emergency_phone: profile.emergency_phone,
            blood_group: profile.blood_group,
            allergies: profile.allergies,
            medical_history: profile.medical_history,
            created_at: now,
            updated_at: now,
        };

        let saved = self.patients.save(patient).await?;
        info!(patient_id = %saved.id, "patient registered");
        Ok(saved)
    }

    pub async fn update(&self, id: Uuid, req: PatientRequest) -> ServiceResult<Patient> {
        let mut patient = self.get(id).await?;
        let profile = self.validate(&req)?;
        self.ensure_contact_unique(&profile, Some(id)).await?;

        patient.first_name = profile.first_name;
        patient.last_name = profile.last_name;
        patient.email = profile.email;
        patient.phone = profile.phone;
        patient.date_of_birth = profile.date_of_birth;
        patient.gender = profile.gender;
        patient.address = profile.address;
        patient.emergency_contact = profile.emergency_contact;
        patient.emergency_phone = profile.emergency_phone;
        patient.blood_group = profile.blood_group;
        patient.allergies = profile.allergies;
        patient.medical_history = profile.medical_history;
        patient.updated_at = self.clock.now();

        let saved = self.patients.save(patient).await?;
        info!(patient_id = %saved.id, "patient profile updated");
        Ok(saved)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Patient> {
        self.patients
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient not found with id: {id}")))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Patient>> {
        Ok(self.patients.find_all().await?)
    }

    pub async fn by_email(&self, email: &str) -> ServiceResult<Patient> {
        let email = email.trim();
        self.patients
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient not found with email: {email}")))
    }

    pub async fn by_phone(&self, phone: &str) -> ServiceResult<Patient> {
        let phone = phone.trim();
        self.patients
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient not found with phone: {phone}")))
    }

    /// Blank input lists everyone.
    pub async fn search_by_name(&self, name: &str) -> ServiceResult<Vec<Patient>> {
        let name = name.trim();
        if name.is_empty() {
            return self.list().await;
        }
        Ok(self.patients.search_by_name(name).await?)
    }

    pub async fn by_gender(&self, gender: &str) -> ServiceResult<Vec<Patient>> {
        Ok(self.patients.find_by_gender(gender.trim()).await?)
    }

    pub async fn by_blood_group(&self, blood_group: &str) -> ServiceResult<Vec<Patient>> {
        Ok(self.patients.find_by_blood_group(blood_group.trim()).await?)
    }

    /// Patients registered on or after the start of the day `days` ago.
    pub async fn registered_since_days(&self, days: i64) -> ServiceResult<Vec<Patient>> {
        if days < 0 {
            return Err(ServiceError::Validation("days must not be negative".into()));
        }
        let today = self.clock.now().date().and_time(NaiveTime::MIN);
        let since = Duration::try_days(days)
            .and_then(|span| today.checked_sub_signed(span))
            .ok_or_else(|| ServiceError::Validation("days is out of range".into()))?;

        Ok(self.patients.registered_since(since).await?)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        if !self.patients.delete(id).await? {
            return Err(ServiceError::NotFound(format!("Patient not found with id: {id}")));
        }
        info!(patient_id = %id, "patient deleted");
        Ok(())
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.patients.count().await?)
    }

    pub async fn count_by_gender(&self, gender: &str) -> ServiceResult<i64> {
        Ok(self.patients.count_by_gender(gender.trim()).await?)
    }
}
