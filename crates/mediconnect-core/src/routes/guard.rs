//! Navigation admission by authentication state and role.

use crate::auth::SessionContext;
use crate::models::Role;

use super::navigation::LOGIN_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Admit,
    Redirect(String),
    NotFound,
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Login and registration: signed-in users are sent to their landing area
    PublicOnly,
    /// Any signed-in user; `Some(role)` requires an exact role match
    Protected(Option<Role>),
    /// Signed-in users are forwarded to their landing area
    Landing,
}

/// Landing area for a session, falling back to the patient area when
/// the stored profile carries no role.
fn landing_for(role: Option<Role>) -> &'static str {
    role.unwrap_or(Role::Patient).landing_path()
}

pub fn protected(required_role: Option<Role>, session: &SessionContext) -> GuardDecision {
    if !session.is_authenticated() {
        return GuardDecision::Redirect(LOGIN_PATH.to_string());
    }
    match required_role {
        Some(required) if session.role() != Some(required) => {
            GuardDecision::Redirect(landing_for(session.role()).to_string())
        }
        _ => GuardDecision::Admit,
    }
}

pub fn public_only(session: &SessionContext) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Redirect(landing_for(session.role()).to_string())
    } else {
        GuardDecision::Admit
    }
}

/// Access rule for a known path
pub fn access_for(path: &str) -> Option<Access> {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    match path {
        "/login" | "/register" => Some(Access::PublicOnly),
        "/" | "/dashboard" => Some(Access::Landing),
        "/admin" | "/admin/doctors" => Some(Access::Protected(Some(Role::Admin))),
        "/doctor" | "/doctor/profile" => Some(Access::Protected(Some(Role::Doctor))),
        "/patient" | "/patient/profile" => Some(Access::Protected(Some(Role::Patient))),
        _ => None,
    }
}

/// Decide a navigation to `path` for the current session.
pub fn resolve(path: &str, session: &SessionContext) -> GuardDecision {
    match access_for(path) {
        Some(Access::PublicOnly) => public_only(session),
        Some(Access::Protected(role)) => protected(role, session),
        Some(Access::Landing) => match protected(None, session) {
            GuardDecision::Admit => GuardDecision::Redirect(landing_for(session.role()).to_string()),
            other => other,
        },
        None => GuardDecision::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::MemoryCredentialStore;
    use crate::models::UserProfile;

    fn session_as(role: Option<Role>) -> SessionContext {
        let session = SessionContext::new(Arc::new(MemoryCredentialStore::new()));
        if let Some(role) = role {
            let user = UserProfile {
                id: None,
                first_name: "Ann".to_string(),
                last_name: String::new(),
                email: String::new(),
                role,
            };
            session.login("T1", "R1", user, 3600).unwrap();
        }
        session
    }

    fn redirect(to: &str) -> GuardDecision {
        GuardDecision::Redirect(to.to_string())
    }

    #[test]
    fn test_unauthenticated_goes_to_login() {
        let session = session_as(None);
        assert_eq!(resolve("/patient", &session), redirect("/login"));
        assert_eq!(resolve("/admin/doctors", &session), redirect("/login"));
        assert_eq!(resolve("/", &session), redirect("/login"));
        assert_eq!(resolve("/login", &session), GuardDecision::Admit);
        assert_eq!(resolve("/register", &session), GuardDecision::Admit);
    }

    #[test]
    fn test_role_must_match_exactly() {
        for role in [Role::Admin, Role::Doctor, Role::Patient] {
            let session = session_as(Some(role));
            for target in [Role::Admin, Role::Doctor, Role::Patient] {
                let decision = protected(Some(target), &session);
                if role == target {
                    assert_eq!(decision, GuardDecision::Admit);
                } else {
                    assert_eq!(decision, redirect(role.landing_path()));
                }
            }
            assert_eq!(protected(None, &session), GuardDecision::Admit);
        }
    }

    #[test]
    fn test_public_only_bounces_signed_in_users() {
        assert_eq!(resolve("/login", &session_as(Some(Role::Admin))), redirect("/admin"));
        assert_eq!(resolve("/register", &session_as(Some(Role::Doctor))), redirect("/doctor"));
    }

    #[test]
    fn test_landing_and_unknown_paths() {
        let session = session_as(Some(Role::Doctor));
        assert_eq!(resolve("/", &session), redirect("/doctor"));
        assert_eq!(resolve("/dashboard/", &session), redirect("/doctor"));
        assert_eq!(resolve("/billing", &session), GuardDecision::NotFound);
    }

    #[test]
    fn test_patient_scenario() {
        let session = session_as(Some(Role::Patient));
        assert_eq!(resolve("/patient", &session), GuardDecision::Admit);
        assert_eq!(resolve("/admin", &session), redirect("/patient"));
    }
}
