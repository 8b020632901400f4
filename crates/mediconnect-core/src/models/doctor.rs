use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(alias = "id")]
    pub doctor_id: Option<String>,
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub primary_specialization: Option<String>,
    #[serde(default)]
    pub active: bool,
    pub date_of_joining: Option<NaiveDate>,
    #[serde(default)]
    pub availability_list: Vec<DoctorAvailability>,
    #[serde(default)]
    pub profile_complete: bool,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        let name = format!("{} {}", first, last).trim().to_string();
        if name.is_empty() {
            "Unknown doctor".to_string()
        } else {
            format!("Dr. {}", name)
        }
    }

    pub fn specialization_display(&self) -> &str {
        self.primary_specialization.as_deref().unwrap_or("General")
    }
}

/// Body for creating or updating a doctor profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub primary_specialization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_joining: Option<NaiveDate>,
}

/// Date-specific override of a doctor's regular hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub schedule_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub working: bool,
}

/// Regular weekly hours for one day of the week.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAvailability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// MONDAY, TUESDAY, ...
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_doctor_response() {
        let json = r#"{"doctorId":"7f1c","userId":"u1","firstName":"Grace","lastName":"Hopper","email":"g@h.org","primarySpecialization":"Cardiology","active":true,"dateOfJoining":"2024-03-01","availabilityList":[{"dayOfWeek":"MONDAY","startTime":"09:00:00","endTime":"17:00:00"}],"profileComplete":false}"#;
        let doctor: Doctor = serde_json::from_str(json).expect("Failed to parse doctor JSON");
        assert_eq!(doctor.display_name(), "Dr. Grace Hopper");
        assert_eq!(doctor.specialization_display(), "Cardiology");
        assert_eq!(doctor.date_of_joining, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(doctor.availability_list.len(), 1);
        assert!(doctor.availability_list[0].available);
    }

    #[test]
    fn test_doctor_display_name_missing() {
        let doctor: Doctor = serde_json::from_str(r#"{"doctorId":null}"#).unwrap();
        assert_eq!(doctor.display_name(), "Unknown doctor");
        assert_eq!(doctor.specialization_display(), "General");
    }
}
