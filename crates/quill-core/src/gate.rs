//! Admin authentication gate
//!
//! Decides what happens to a request for the admin surface before it can
//! reach a store. The HTTP layer maps the decision onto its own response
//! types: `RedirectToLogin` becomes a 303 to [`LOGIN_PATH`], `Reject` a 403.

use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::session::{AuthError, Credentials, SessionCookie, SessionRegistry};

/// Login entry point
pub const LOGIN_PATH: &str = "/admin/login";

/// Logout entry point
pub const LOGOUT_PATH: &str = "/admin/logout";

/// Prefix of static assets, served without a session
pub const STATIC_PREFIX: &str = "/static";

/// Request method as far as the gate cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Create/update/delete-class methods that need a CSRF token
    pub fn is_state_changing(self) -> bool {
        matches!(
            self,
            Method::Post | Method::Put | Method::Patch | Method::Delete
        )
    }
}

/// What the gate needs to know about a request
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub method: Method,
    pub path: &'a str,
    /// Value of the session cookie, if any
    pub session_token: Option<&'a str>,
    /// Submitted `csrf_token` form value, if any
    pub csrf_token: Option<&'a str>,
}

/// Outcome of [`AdminGate::check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    Reject(AuthError),
}

/// Guards the admin surface with sessions and CSRF tokens
pub struct AdminGate {
    sessions: Arc<SessionRegistry>,
    credentials: Credentials,
}

impl AdminGate {
    pub fn new(sessions: Arc<SessionRegistry>, credentials: Credentials) -> Self {
        Self {
            sessions,
            credentials,
        }
    }

    /// Gate checking logins against the admin account in `config`
    pub fn from_config(config: &Config, sessions: Arc<SessionRegistry>) -> Self {
        Self::new(sessions, config.admin_credentials())
    }

    /// The session registry this gate consults
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Check credentials and start a session, returning the cookie to set
    pub fn login(&self, username: &str, password: &str) -> Result<SessionCookie, AuthError> {
        self.credentials.verify(username, password).inspect_err(|_| {
            warn!("Rejected admin login for user '{}'", username);
        })?;
        let token = self.sessions.create_session()?;
        Ok(SessionCookie::issue(token, self.sessions.ttl()))
    }

    /// End the session behind `token` and return the clearing cookie
    pub fn logout(&self, token: Option<&str>) -> SessionCookie {
        if let Some(token) = token {
            self.sessions.destroy(token);
        }
        SessionCookie::clear()
    }

    /// Decide whether `request` may proceed
    pub fn check(&self, request: &GateRequest<'_>) -> GateDecision {
        if is_public_path(request.path) {
            return GateDecision::Allow;
        }

        let token = request.session_token.unwrap_or_default();
        if !self.sessions.is_authenticated(token) {
            return GateDecision::RedirectToLogin;
        }

        if request.method.is_state_changing() {
            if let Err(e) = self.sessions.verify_csrf(token, request.csrf_token) {
                warn!("Rejected {:?} {}: {}", request.method, request.path, e);
                return GateDecision::Reject(e);
            }
        }

        GateDecision::Allow
    }
}

fn is_public_path(path: &str) -> bool {
    path == LOGIN_PATH || path == LOGOUT_PATH || path.starts_with(STATIC_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::ManualClock;
    use chrono::Duration;

    fn gate() -> (AdminGate, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let sessions = Arc::new(SessionRegistry::with_clock(
            Duration::hours(24),
            clock.clone(),
        ));
        (
            AdminGate::new(sessions, Credentials::new("admin", "hunter2")),
            clock,
        )
    }

    fn request<'a>(
        method: Method,
        path: &'a str,
        session_token: Option<&'a str>,
        csrf_token: Option<&'a str>,
    ) -> GateRequest<'a> {
        GateRequest {
            method,
            path,
            session_token,
            csrf_token,
        }
    }

    #[test]
    fn test_public_paths_pass_without_session() {
        let (gate, _) = gate();
        for path in [LOGIN_PATH, LOGOUT_PATH, "/static/app.css"] {
            assert_eq!(
                gate.check(&request(Method::Post, path, None, None)),
                GateDecision::Allow
            );
        }
    }

    #[test]
    fn test_missing_session_redirects_to_login() {
        let (gate, _) = gate();
        assert_eq!(
            gate.check(&request(Method::Get, "/admin/posts", None, None)),
            GateDecision::RedirectToLogin
        );
        assert_eq!(
            gate.check(&request(Method::Get, "/admin/posts", Some("bogus"), None)),
            GateDecision::RedirectToLogin
        );
    }

    #[test]
    fn test_login_rejects_bad_credentials() {
        let (gate, _) = gate();
        assert_eq!(
            gate.login("admin", "wrong").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert!(gate.sessions().is_empty());
    }

    #[test]
    fn test_reads_need_only_a_session() {
        let (gate, _) = gate();
        let cookie = gate.login("admin", "hunter2").unwrap();
        assert_eq!(cookie.max_age, 86_400);

        assert_eq!(
            gate.check(&request(Method::Get, "/admin/posts", Some(&cookie.value), None)),
            GateDecision::Allow
        );
    }

    #[test]
    fn test_state_changing_requests_need_matching_csrf() {
        let (gate, _) = gate();
        let cookie = gate.login("admin", "hunter2").unwrap();
        let token = cookie.value.as_str();
        let csrf = gate.sessions().csrf_token(token).unwrap();

        for method in [Method::Post, Method::Put, Method::Patch, Method::Delete] {
            assert_eq!(
                gate.check(&request(method, "/admin/posts/new", Some(token), Some(&csrf))),
                GateDecision::Allow
            );
            assert_eq!(
                gate.check(&request(method, "/admin/posts/new", Some(token), None)),
                GateDecision::Reject(AuthError::CsrfMismatch)
            );
            assert_eq!(
                gate.check(&request(method, "/admin/posts/new", Some(token), Some("x"))),
                GateDecision::Reject(AuthError::CsrfMismatch)
            );
        }
    }

    #[test]
    fn test_gate_uses_configured_admin_account() {
        let config = Config {
            admin_user: "editor".to_string(),
            admin_pass: "s3cret".to_string(),
            ..Config::default()
        };
        let gate = AdminGate::from_config(&config, Arc::new(SessionRegistry::new()));

        assert_eq!(
            gate.login("admin", "admin").unwrap_err(),
            AuthError::InvalidCredentials
        );
        let cookie = gate.login("editor", "s3cret").unwrap();
        assert!(gate.sessions().is_authenticated(&cookie.value));
    }

    #[test]
    fn test_rejection_decision_can_be_cloned() {
        let decision = GateDecision::Reject(AuthError::CsrfMismatch);
        assert_eq!(decision.clone(), decision);
    }

    #[test]
    fn test_expired_session_redirects() {
        let (gate, clock) = gate();
        let cookie = gate.login("admin", "hunter2").unwrap();
        let csrf = gate.sessions().csrf_token(&cookie.value).unwrap();

        clock.advance(Duration::hours(25));
        assert_eq!(
            gate.check(&request(
                Method::Post,
                "/admin/posts/new",
                Some(&cookie.value),
                Some(&csrf)
            )),
            GateDecision::RedirectToLogin
        );
        assert!(gate.sessions().is_empty());
    }

    #[test]
    fn test_logout_ends_session() {
        let (gate, _) = gate();
        let cookie = gate.login("admin", "hunter2").unwrap();

        let cleared = gate.logout(Some(&cookie.value));
        assert_eq!(cleared.max_age, 0);
        assert_eq!(
            gate.check(&request(Method::Get, "/admin", Some(&cookie.value), None)),
            GateDecision::RedirectToLogin
        );
    }
}
