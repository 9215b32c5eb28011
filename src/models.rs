use std::{fmt, str::FromStr, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    clock::Clock,
    services::{appointments::AppointmentService, patients::PatientService},
    store::{AppointmentStore, PatientStore},
};

#[derive(Clone)]
pub struct AppState {
    pub patients: PatientService,
    pub appointments: AppointmentService,
}

impl AppState {
    /// Both services share one backing store; the store is only ever
    /// reached through its two trait objects.
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: PatientStore + AppointmentStore + 'static,
    {
        let patient_store: Arc<dyn PatientStore> = store.clone();
        let appointment_store: Arc<dyn AppointmentStore> = store;

        Self {
            patients: PatientService::new(patient_store.clone(), clock.clone()),
            appointments: AppointmentService::new(appointment_store, patient_store, clock),
        }
    }
}

/* -------------------------
   Records
--------------------------*/

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    #[serde(with = "datetime_format")]
    pub created_at: NaiveDateTime,
    #[serde(with = "datetime_format")]
    pub updated_at: NaiveDateTime,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_name: String,
    pub department: String,
    #[serde(with = "datetime_format")]
    pub appointment_date_time: NaiveDateTime,
    pub appointment_type: String,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub diagnosis: Option<String>,
    pub fee: Option<f64>,
    pub room_number: Option<String>,
    #[serde(with = "datetime_format")]
    pub created_at: NaiveDateTime,
    #[serde(with = "datetime_format")]
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    /// Active appointments hold their doctor's conflict window.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_upcoming(&self, now: NaiveDateTime) -> bool {
        self.appointment_date_time > now && self.is_active()
    }

    pub fn can_be_cancelled(&self, now: NaiveDateTime) -> bool {
        self.is_upcoming(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ACTIVE: [AppointmentStatus; 2] =
        [AppointmentStatus::Scheduled, AppointmentStatus::Confirmed];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::InProgress => "IN_PROGRESS",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown appointment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(AppointmentStatus::Scheduled),
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "IN_PROGRESS" => Ok(AppointmentStatus::InProgress),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            "NO_SHOW" => Ok(AppointmentStatus::NoShow),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

// Postgres keeps the status as TEXT.
impl TryFrom<String> for AppointmentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/* -------------------------
   API DTOs
--------------------------*/

/// Body of `POST /patients` and `PUT /patients/{id}`. Every field is
/// optional on the wire so that a missing field is reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_name: Option<String>,
    pub department: Option<String>,
    #[serde(default, with = "datetime_format::option")]
    pub appointment_date_time: Option<NaiveDateTime>,
    pub appointment_type: Option<String>,
    /// Ignored on create; applied on update when present.
    pub status: Option<AppointmentStatus>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub diagnosis: Option<String>,
    pub fee: Option<f64>,
    pub room_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self {
            data: OkData { ok: true },
        }
    }
}

/* -------------------------
   Helpers
--------------------------*/

/// `yyyy-MM-dd HH:mm:ss` on the wire. ISO `T`-separated input is accepted too.
pub mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| raw.parse::<NaiveDateTime>())
            .ok()
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| {
            D::Error::custom(format!("expected yyyy-MM-dd HH:mm:ss, got {raw:?}"))
        })
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            use serde::de::Error;

            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("expected yyyy-MM-dd HH:mm:ss, got {raw:?}"))
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ts;

    #[test]
    fn status_parses_wire_names() {
        assert_eq!("IN_PROGRESS".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::InProgress);
        assert_eq!("no_show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert!("LATE".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn only_scheduled_and_confirmed_are_active() {
        let active: Vec<_> = [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ]
        .into_iter()
        .filter(|s| s.is_active())
        .collect();

        assert_eq!(active, AppointmentStatus::ACTIVE.to_vec());
    }

    #[test]
    fn request_accepts_both_datetime_forms() {
        let spaced: AppointmentRequest =
            serde_json::from_str(r#"{"appointment_date_time":"2030-01-01 10:00:00"}"#).unwrap();
        let iso: AppointmentRequest =
            serde_json::from_str(r#"{"appointment_date_time":"2030-01-01T10:00:00"}"#).unwrap();

        assert_eq!(spaced.appointment_date_time, Some(ts("2030-01-01 10:00:00")));
        assert_eq!(iso.appointment_date_time, spaced.appointment_date_time);
    }

    #[test]
    fn request_rejects_malformed_datetime() {
        let parsed = serde_json::from_str::<AppointmentRequest>(
            r#"{"appointment_date_time":"01/01/2030 10:00"}"#,
        );
        assert!(parsed.is_err());
    }
}
