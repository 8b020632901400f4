use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
    Rescheduled,
    NoShow,
    #[serde(other)]
    Unknown,
}

impl AppointmentStatus {
    /// Whether the appointment can still be cancelled or rescheduled
    pub fn is_open(&self) -> bool {
        matches!(self, AppointmentStatus::Booked | AppointmentStatus::Rescheduled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(alias = "id")]
    pub appointment_id: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub slot_start: Option<NaiveDateTime>,
    pub slot_end: Option<NaiveDateTime>,
    pub status: Option<AppointmentStatus>,
    pub consultation_type: Option<String>,
    pub reason: Option<String>,
    #[serde(default)]
    pub paid: bool,
}

impl Appointment {
    pub fn duration_minutes(&self) -> Option<i64> {
        match (self.slot_start, self.slot_end) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub doctor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub slot_start: NaiveDateTime,
    pub slot_end: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Partial update; absent fields are left unchanged by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_start: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_end: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub slot_start: NaiveDateTime,
    pub slot_end: NaiveDateTime,
}
