use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::{
    clock::Clock,
    models::{AppState, AppointmentRequest, PatientRequest, datetime_format},
    store::memory::MemoryStore,
};

pub fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, datetime_format::FORMAT).expect("valid test timestamp")
}

/// Clock pinned to a settable instant.
pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub fn at(raw: &str) -> Self {
        Self(Mutex::new(ts(raw)))
    }

    pub fn set(&self, raw: &str) {
        *self.0.lock().unwrap() = ts(raw);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
}

/// Services over a fresh in-memory store, with the clock at `now`.
pub fn test_app(now: &str) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let clock = Arc::new(FixedClock::at(now));
    let state = AppState::new(store.clone(), clock.clone());

    TestApp { state, store, clock }
}

pub fn patient_request(tag: &str) -> PatientRequest {
    PatientRequest {
        first_name: Some("John".into()),
        last_name: Some(format!("Doe-{tag}")),
        email: Some(format!("john.{tag}@example.com")),
        phone: Some(format!("+1-555-{tag}")),
        date_of_birth: NaiveDate::from_ymd_opt(1985, 4, 12),
        gender: Some("Male".into()),
        blood_group: Some("O+".into()),
        ..Default::default()
    }
}

pub fn appointment_request(patient_id: Uuid, doctor: &str, at: &str) -> AppointmentRequest {
    AppointmentRequest {
        patient_id: Some(patient_id),
        doctor_name: Some(doctor.into()),
        department: Some("Cardiology".into()),
        appointment_date_time: Some(ts(at)),
        appointment_type: Some("CONSULTATION".into()),
        ..Default::default()
    }
}
