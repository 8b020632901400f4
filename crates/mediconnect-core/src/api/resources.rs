//! Doctor, patient and appointment endpoints.

use anyhow::Result;
use chrono::NaiveDate;

use super::ApiClient;
use crate::models::{
    Appointment, AppointmentRequest, AppointmentUpdate, Doctor, DoctorAvailability,
    DoctorProfileRequest, DoctorSchedule, Patient, PatientProfileRequest, Slot,
};

impl ApiClient {
    // ===== Doctors =====

    pub async fn create_doctor_profile(&self, profile: &DoctorProfileRequest) -> Result<Doctor> {
        self.post("/api/doctors", profile).await
    }

    /// Profile of the signed-in doctor
    pub async fn fetch_own_doctor_profile(&self) -> Result<Doctor> {
        self.get("/api/doctors/me", &[]).await
    }

    pub async fn update_doctor_profile(&self, doctor_id: &str, profile: &DoctorProfileRequest) -> Result<Doctor> {
        self.put(&format!("/api/doctors/{}", doctor_id), profile).await
    }

    pub async fn fetch_doctors(&self, filters: &[(&str, &str)]) -> Result<Vec<Doctor>> {
        self.get("/api/doctors", filters).await
    }

    pub async fn fetch_doctor(&self, doctor_id: &str) -> Result<Doctor> {
        self.get(&format!("/api/doctors/{}", doctor_id), &[]).await
    }

    pub async fn create_schedule(&self, schedule: &DoctorSchedule) -> Result<DoctorSchedule> {
        self.post("/api/doctors/schedule", schedule).await
    }

    pub async fn fetch_schedule(&self) -> Result<Vec<DoctorSchedule>> {
        self.get("/api/doctors/schedule", &[]).await
    }

    pub async fn create_availability(&self, availability: &DoctorAvailability) -> Result<DoctorAvailability> {
        self.post("/api/doctors/availability", availability).await
    }

    pub async fn fetch_availability(&self) -> Result<Vec<DoctorAvailability>> {
        self.get("/api/doctors/availability", &[]).await
    }

    // ===== Patients =====

    pub async fn create_patient_profile(&self, profile: &PatientProfileRequest) -> Result<Patient> {
        self.post("/api/patients", profile).await
    }

    /// Profile of the signed-in patient
    pub async fn fetch_own_patient_profile(&self) -> Result<Patient> {
        self.get("/api/patients/me", &[]).await
    }

    pub async fn update_patient_profile(&self, patient_id: &str, profile: &PatientProfileRequest) -> Result<Patient> {
        self.put(&format!("/api/patients/{}", patient_id), profile).await
    }

    pub async fn fetch_patients(&self, filters: &[(&str, &str)]) -> Result<Vec<Patient>> {
        self.get("/api/patients", filters).await
    }

    pub async fn fetch_patient(&self, patient_id: &str) -> Result<Patient> {
        self.get(&format!("/api/patients/{}", patient_id), &[]).await
    }

    // ===== Appointments =====

    pub async fn create_appointment(&self, request: &AppointmentRequest) -> Result<Appointment> {
        self.post("/api/appointments", request).await
    }

    pub async fn fetch_appointments(&self, filters: &[(&str, &str)]) -> Result<Vec<Appointment>> {
        self.get("/api/appointments", filters).await
    }

    pub async fn fetch_appointment(&self, appointment_id: &str) -> Result<Appointment> {
        self.get(&format!("/api/appointments/{}", appointment_id), &[]).await
    }

    pub async fn update_appointment(&self, appointment_id: &str, update: &AppointmentUpdate) -> Result<Appointment> {
        self.put(&format!("/api/appointments/{}", appointment_id), update).await
    }

    pub async fn cancel_appointment(&self, appointment_id: &str) -> Result<Appointment> {
        self.post(&format!("/api/appointments/{}/cancel", appointment_id), &serde_json::json!({}))
            .await
    }

    pub async fn fetch_available_slots(&self, doctor_id: &str, date: NaiveDate) -> Result<Vec<Slot>> {
        let date = date.format("%Y-%m-%d").to_string();
        self.get("/api/appointments/slots", &[("doctorId", doctor_id), ("date", &date)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::{Method, StatusCode};

    use super::*;
    use crate::api::testing::MockTransport;
    use crate::api::{ApiError, ApiResponse};
    use crate::auth::{CredentialRecord, MemoryCredentialStore};
    use crate::models::AppointmentStatus;
    use crate::routes::Navigator;

    fn client_for(transport: Arc<MockTransport>) -> ApiClient {
        let store = MemoryCredentialStore::with_record(CredentialRecord {
            access_token: Some("T1".to_string()),
            ..Default::default()
        });
        ApiClient::new(transport, Arc::new(store), Navigator::detached())
    }

    #[tokio::test]
    async fn test_fetch_doctors_with_filters_and_envelope() {
        let transport = Arc::new(MockTransport::new(|_| {
            ApiResponse::new(
                StatusCode::OK,
                r#"{"success":true,"message":"ok","data":[{"doctorId":"d1","firstName":"Grace","lastName":"Hopper"}]}"#,
            )
        }));
        let client = client_for(transport.clone());

        let doctors = client.fetch_doctors(&[("specialization", "Cardiology")]).await.unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].display_name(), "Dr. Grace Hopper");

        let sent = &transport.requests()[0];
        assert_eq!(sent.path, "/api/doctors");
        assert_eq!(sent.query, vec![("specialization".to_string(), "Cardiology".to_string())]);
        assert_eq!(sent.bearer.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_available_slots_query() {
        let transport = Arc::new(MockTransport::new(|_| {
            ApiResponse::new(
                StatusCode::OK,
                r#"[{"slotStart":"2025-01-10T09:00:00","slotEnd":"2025-01-10T09:30:00"}]"#,
            )
        }));
        let client = client_for(transport.clone());
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        let slots = client.fetch_available_slots("d1", date).await.unwrap();
        assert_eq!(slots.len(), 1);
        let sent = &transport.requests()[0];
        assert_eq!(sent.path, "/api/appointments/slots");
        assert!(sent.query.contains(&("date".to_string(), "2025-01-10".to_string())));
        assert!(sent.query.contains(&("doctorId".to_string(), "d1".to_string())));
    }

    #[tokio::test]
    async fn test_cancel_appointment() {
        let transport = Arc::new(MockTransport::new(|_| {
            ApiResponse::new(StatusCode::OK, r#"{"appointmentId":"a1","status":"CANCELLED"}"#)
        }));
        let client = client_for(transport.clone());

        let appt = client.cancel_appointment("a1").await.unwrap();
        assert_eq!(appt.status, Some(AppointmentStatus::Cancelled));
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.path, "/api/appointments/a1/cancel");
    }

    #[tokio::test]
    async fn test_server_error_surfaces_as_api_error() {
        let transport = Arc::new(MockTransport::new(|_| {
            ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "boom")
        }));
        let client = client_for(transport);
        let err = client.fetch_patient("p1").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::ServerError(_))));
    }
}
