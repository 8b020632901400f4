//! Subcommand definitions and handlers.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use mediconnect_core::auth::flow::{self, RegistrationDraft};
use mediconnect_core::cache::{DraftCache, REGISTRATION_DRAFT_KEY};
use mediconnect_core::models::{AppointmentRequest, Role};
use mediconnect_core::routes::{resolve, GuardDecision};
use mediconnect_core::{ApiClient, Config, SessionContext};

use crate::prompt;

/// Minimum password length accepted at registration
const PASSWORD_MIN_LENGTH: usize = 8;

#[derive(Parser)]
#[command(name = "mediconnect", version, about = "MediConnect appointment-booking client")]
pub struct Cli {
    /// Also write logs to a daily file in the cache directory
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account (resumes a saved draft)
    Register,
    /// List saved form drafts
    Drafts,
    /// Check whether a page is reachable with the current session
    Open { path: String },
    /// Doctor directory and the signed-in doctor's profile
    #[command(subcommand)]
    Doctors(DoctorCommand),
    /// Patient records
    #[command(subcommand)]
    Patients(PatientCommand),
    /// Appointments and booking
    #[command(subcommand)]
    Appointments(AppointmentCommand),
}

#[derive(Subcommand)]
pub enum DoctorCommand {
    List {
        #[arg(long)]
        specialization: Option<String>,
    },
    Show { id: String },
    Me,
    Schedule,
    Availability,
}

#[derive(Subcommand)]
pub enum PatientCommand {
    List,
    Show { id: String },
    Me,
}

#[derive(Subcommand)]
pub enum AppointmentCommand {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Show { id: String },
    Book {
        #[arg(long)]
        doctor: String,
        /// Slot start, e.g. 2025-01-10T09:00:00
        #[arg(long)]
        start: NaiveDateTime,
        #[arg(long)]
        end: NaiveDateTime,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long = "type")]
        consultation_type: Option<String>,
    },
    Cancel { id: String },
    Slots {
        #[arg(long)]
        doctor: String,
        /// Day to search, e.g. 2025-01-10
        #[arg(long)]
        date: NaiveDate,
    },
}

pub struct Context {
    pub config: Config,
    pub client: ApiClient,
    pub session: Arc<SessionContext>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require_session(ctx: &Context) -> Result<()> {
    if ctx.session.is_authenticated() {
        Ok(())
    } else {
        Err(anyhow!("Not signed in. Run `mediconnect login` first."))
    }
}

/// Drafts are a convenience; without a keychain they are skipped.
fn open_drafts(ctx: &Context) -> Option<DraftCache> {
    let dir = ctx.config.cache_dir().ok()?;
    match DraftCache::with_keychain(&dir) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(error = %e, "Draft cache unavailable");
            None
        }
    }
}

pub async fn run(command: Command, ctx: &mut Context) -> Result<()> {
    match command {
        Command::Login { email } => login(ctx, email).await,
        Command::Logout => {
            flow::sign_out(&ctx.client, &ctx.session).await?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => whoami(ctx),
        Command::Register => register(ctx).await,
        Command::Drafts => {
            let Some(drafts) = open_drafts(ctx) else {
                return Err(anyhow!("Draft cache unavailable"));
            };
            for draft in drafts.list()? {
                println!("{}\t{}", draft.key, draft.saved_at.to_rfc3339());
            }
            Ok(())
        }
        Command::Open { path } => {
            match resolve(&path, &ctx.session) {
                GuardDecision::Admit => println!("{}", path),
                GuardDecision::Redirect(to) => println!("{} -> {}", path, to),
                GuardDecision::NotFound => println!("{}: page not found", path),
            }
            Ok(())
        }
        Command::Doctors(cmd) => {
            require_session(ctx)?;
            doctors(&ctx.client, cmd).await
        }
        Command::Patients(cmd) => {
            require_session(ctx)?;
            patients(&ctx.client, cmd).await
        }
        Command::Appointments(cmd) => {
            require_session(ctx)?;
            appointments(&ctx.client, cmd).await
        }
    }
}

async fn login(ctx: &mut Context, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt::line("Email", ctx.config.last_email.as_deref())?,
    };
    let password = prompt::password("Password")?;

    let user = flow::sign_in(&ctx.client, &ctx.session, &email, &password).await?;
    println!("Welcome back, {}!", user.first_name);

    ctx.config.last_email = Some(email);
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

fn whoami(ctx: &Context) -> Result<()> {
    let Some(data) = ctx.session.snapshot() else {
        println!("Not signed in.");
        return Ok(());
    };
    match data.user {
        Some(ref user) => println!("{} <{}> ({})", user.full_name(), user.email, user.role),
        None => println!("Signed in (no profile stored)"),
    }
    if data.is_expired() {
        println!("Access token expired; it will be refreshed on the next request");
    } else if let Some(minutes) = data.minutes_until_expiry() {
        println!("Access token expires in {} min", minutes);
    }
    Ok(())
}

async fn register(ctx: &mut Context) -> Result<()> {
    if let GuardDecision::Redirect(to) = resolve("/register", &ctx.session) {
        println!("Already signed in; your dashboard is {}", to);
        return Ok(());
    }

    let drafts = open_drafts(ctx);
    let mut draft = drafts
        .as_ref()
        .and_then(|d| d.load::<RegistrationDraft>(REGISTRATION_DRAFT_KEY))
        .map(|cached| {
            println!("Resuming your registration (saved {})...", cached.age_display());
            cached.data
        })
        .unwrap_or_default();

    let save = |draft: &RegistrationDraft| {
        if let Some(ref drafts) = drafts {
            if let Err(e) = drafts.save(REGISTRATION_DRAFT_KEY, draft) {
                warn!(error = %e, "Failed to save registration draft");
            }
        }
    };

    draft.first_name = prompt::line("First name", Some(draft.first_name.as_str()))?;
    save(&draft);
    draft.last_name = prompt::line("Last name", Some(draft.last_name.as_str()))?;
    save(&draft);
    draft.email = prompt::line("Email", Some(draft.email.as_str()))?;
    save(&draft);
    let current_role = draft.role.map(|r| r.to_string());
    let role: Role = prompt::line("Role (DOCTOR/PATIENT)", current_role.as_deref())?
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    if role == Role::Admin {
        return Err(anyhow!("Administrator accounts cannot be self-registered"));
    }
    draft.role = Some(role);
    save(&draft);

    if !draft.is_complete() {
        return Err(anyhow!("Registration incomplete; run `mediconnect register` to continue"));
    }

    let password = prompt::password("Password")?;
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(anyhow!("Password must be at least {} characters", PASSWORD_MIN_LENGTH));
    }
    if prompt::password("Confirm password")? != password {
        return Err(anyhow!("Passwords do not match"));
    }
    if !prompt::confirm("Create account")? {
        println!("Draft kept; run `mediconnect register` to continue.");
        return Ok(());
    }

    let email = draft.email.clone();
    let request = draft
        .into_request(password)
        .ok_or_else(|| anyhow!("Role is required"))?;
    let user = flow::register(&ctx.client, &ctx.session, drafts.as_ref(), request).await?;
    println!("Account created. Your dashboard is {}", user.role.landing_path());

    ctx.config.last_email = Some(email);
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

async fn doctors(client: &ApiClient, cmd: DoctorCommand) -> Result<()> {
    match cmd {
        DoctorCommand::List { specialization } => {
            let filters: Vec<(&str, &str)> = specialization
                .as_deref()
                .map(|s| vec![("specialization", s)])
                .unwrap_or_default();
            let doctors = client.fetch_doctors(&filters).await?;
            for doctor in &doctors {
                println!(
                    "{}\t{}\t{}",
                    doctor.doctor_id.as_deref().unwrap_or("-"),
                    doctor.display_name(),
                    doctor.specialization_display()
                );
            }
            Ok(())
        }
        DoctorCommand::Show { id } => print_json(&client.fetch_doctor(&id).await?),
        DoctorCommand::Me => print_json(&client.fetch_own_doctor_profile().await?),
        DoctorCommand::Schedule => print_json(&client.fetch_schedule().await?),
        DoctorCommand::Availability => print_json(&client.fetch_availability().await?),
    }
}

async fn patients(client: &ApiClient, cmd: PatientCommand) -> Result<()> {
    match cmd {
        PatientCommand::List => {
            for patient in client.fetch_patients(&[]).await? {
                println!(
                    "{}\t{}",
                    patient.patient_id.as_deref().unwrap_or("-"),
                    patient.display_name()
                );
            }
            Ok(())
        }
        PatientCommand::Show { id } => print_json(&client.fetch_patient(&id).await?),
        PatientCommand::Me => print_json(&client.fetch_own_patient_profile().await?),
    }
}

async fn appointments(client: &ApiClient, cmd: AppointmentCommand) -> Result<()> {
    match cmd {
        AppointmentCommand::List { status } => {
            let filters: Vec<(&str, &str)> = status
                .as_deref()
                .map(|s| vec![("status", s)])
                .unwrap_or_default();
            print_json(&client.fetch_appointments(&filters).await?)
        }
        AppointmentCommand::Show { id } => print_json(&client.fetch_appointment(&id).await?),
        AppointmentCommand::Book {
            doctor,
            start,
            end,
            reason,
            consultation_type,
        } => {
            if end <= start {
                return Err(anyhow!("Slot end must be after its start"));
            }
            let request = AppointmentRequest {
                doctor_id: doctor,
                patient_id: None,
                slot_start: start,
                slot_end: end,
                consultation_type,
                reason,
            };
            print_json(&client.create_appointment(&request).await?)
        }
        AppointmentCommand::Cancel { id } => print_json(&client.cancel_appointment(&id).await?),
        AppointmentCommand::Slots { doctor, date } => {
            for slot in client.fetch_available_slots(&doctor, date).await? {
                println!(
                    "{} - {}",
                    slot.slot_start.format("%Y-%m-%d %H:%M"),
                    slot.slot_end.format("%H:%M")
                );
            }
            Ok(())
        }
    }
}
