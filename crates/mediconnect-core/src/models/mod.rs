//! Data models for MediConnect entities.
//!
//! This module contains the data structures exchanged with the
//! MediConnect API:
//!
//! - `Role`, `UserProfile`: the signed-in account and its role
//! - Auth payloads: `LoginResponse`, `RefreshResponse`, `RegistrationRequest`
//! - `Doctor`, `DoctorSchedule`, `DoctorAvailability`: doctor profiles and hours
//! - `Patient`: patient profiles
//! - `Appointment`, `AppointmentRequest`, `Slot`: bookings

pub mod appointment;
pub mod doctor;
pub mod patient;
pub mod user;

pub use appointment::{Appointment, AppointmentRequest, AppointmentStatus, AppointmentUpdate, Slot};
pub use doctor::{Doctor, DoctorAvailability, DoctorProfileRequest, DoctorSchedule};
pub use patient::{Patient, PatientProfileRequest};
pub use user::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegistrationRequest, Role, UserProfile};
