// src/auth.rs
use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{dangerous_insecure_decode, encode, EncodingKey, Header};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    exp: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Reads the identity claims of an ID token. The signature is checked by
    /// the backend on every request, so it is not verified here.
    pub fn from_id_token(token: &str) -> Result<Session> {
        let data = dangerous_insecure_decode::<Claims>(token)
            .map_err(|e| DashboardError::Credential(format!("unreadable ID token: {}", e)))?;
        let expires_at = Utc
            .timestamp_opt(data.claims.exp as i64, 0)
            .single()
            .ok_or_else(|| DashboardError::Credential("ID token expiry out of range".into()))?;
        Ok(Session {
            token: token.to_string(),
            user_id: data.claims.sub,
            email: data.claims.email,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

/// Mints an HS256 ID token for local development and tests.
pub fn issue_token(user_id: &str, email: Option<&str>, ttl: Duration, secret: &str) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| DashboardError::Credential(e.to_string()))
}

/// Supplies fresh ID tokens when the cached one expires.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<String>;
}

pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn fetch_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub struct DevTokenSource {
    pub user_id: String,
    pub secret: String,
    pub ttl: Duration,
}

#[async_trait]
impl TokenSource for DevTokenSource {
    async fn fetch_token(&self) -> Result<String> {
        issue_token(&self.user_id, None, self.ttl, &self.secret)
    }
}

pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;
    fn navigate(&self, route: &str);
}

/// Sends signed-out visitors to the login route. Returns true when a session exists.
pub fn require_session(session: Option<&Session>, login_route: &str, navigator: &dyn Navigator) -> bool {
    if session.is_some() {
        return true;
    }
    if navigator.current_route() != login_route {
        info!("No session, redirecting to {}", login_route);
        navigator.navigate(login_route);
    }
    false
}

/// Visibility of the navigation chrome around every page.
#[derive(Debug, Clone, PartialEq)]
pub struct NavChrome {
    pub show_nav: bool,
    pub show_login_link: bool,
    pub show_logout: bool,
    pub user_info: String,
}

impl NavChrome {
    pub fn for_session(session: Option<&Session>) -> NavChrome {
        match session {
            None => NavChrome {
                show_nav: true,
                show_login_link: true,
                show_logout: false,
                user_info: String::new(),
            },
            Some(session) => NavChrome {
                show_nav: true,
                show_login_link: false,
                show_logout: true,
                user_info: format!(
                    "Signed in as {}",
                    session.email.as_deref().unwrap_or(&session.user_id)
                ),
            },
        }
    }
}

pub struct SessionGate {
    sender: watch::Sender<Option<Session>>,
    source: Option<Arc<dyn TokenSource>>,
    login_route: String,
    refresh: Mutex<()>,
}

impl SessionGate {
    pub fn new(login_route: impl Into<String>) -> Self {
        let (sender, _) = watch::channel(None);
        SessionGate {
            sender,
            source: None,
            login_route: login_route.into(),
            refresh: Mutex::new(()),
        }
    }

    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn sign_in(&self, token: &str) -> Result<Session> {
        let session = Session::from_id_token(token)?;
        info!("Signed in as {}", session.user_id);
        self.sender.send_replace(Some(session.clone()));
        Ok(session)
    }

    pub fn sign_out(&self) {
        if self.sender.send_replace(None).is_some() {
            info!("Signed out");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    /// Observes every authentication transition, starting from the current state.
    pub fn on_session_change(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }

    pub fn guard(&self, navigator: &dyn Navigator) -> Option<Session> {
        let session = self.current();
        if require_session(session.as_ref(), &self.login_route, navigator) {
            session
        } else {
            None
        }
    }

    /// Bearer token for the next request, refreshed through the token source when stale.
    pub async fn credential(&self) -> Result<String> {
        let session = self.current().ok_or(DashboardError::Unauthenticated)?;
        if !session.is_expired() {
            return Ok(session.token);
        }

        let _refreshing = self.refresh.lock().await;
        match self.current() {
            None => return Err(DashboardError::Unauthenticated),
            Some(current) if !current.is_expired() => return Ok(current.token),
            Some(_) => {}
        }

        let source = self
            .source
            .as_ref()
            .ok_or_else(|| DashboardError::Credential("ID token expired".into()))?;
        debug!("Refreshing expired ID token");
        let token = source.fetch_token().await.map_err(|e| {
            warn!("Token refresh failed: {}", e);
            DashboardError::Credential(e.to_string())
        })?;
        let refreshed = Session::from_id_token(&token)?;
        if refreshed.is_expired() {
            return Err(DashboardError::Credential("token source returned an expired token".into()));
        }
        // A sign-out that raced the refresh wins.
        if self.current().is_none() {
            return Err(DashboardError::Unauthenticated);
        }
        self.sender.send_replace(Some(refreshed.clone()));
        Ok(refreshed.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct RecordingNavigator {
        route: String,
        visited: StdMutex<Vec<String>>,
    }

    impl RecordingNavigator {
        fn at(route: &str) -> Self {
            RecordingNavigator {
                route: route.to_string(),
                visited: StdMutex::new(Vec::new()),
            }
        }
    }

    impl Navigator for RecordingNavigator {
        fn current_route(&self) -> String {
            self.route.clone()
        }

        fn navigate(&self, route: &str) {
            self.visited.lock().unwrap().push(route.to_string());
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            issue_token("user-1", Some("a@b.c"), Duration::hours(1), "s")
        }
    }

    #[test]
    fn id_token_claims_are_read() {
        let token = issue_token("user-1", Some("a@b.c"), Duration::hours(1), "secret").unwrap();
        let session = Session::from_id_token(&token).unwrap();
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.email.as_deref(), Some("a@b.c"));
        assert!(!session.is_expired());
    }

    #[test]
    fn garbage_token_is_a_credential_error() {
        assert!(matches!(
            Session::from_id_token("not-a-jwt"),
            Err(DashboardError::Credential(_))
        ));
    }

    #[test]
    fn guard_redirects_only_off_the_login_route() {
        let gate = SessionGate::new("/login");

        let nav = RecordingNavigator::at("/portfolio");
        assert!(gate.guard(&nav).is_none());
        assert_eq!(*nav.visited.lock().unwrap(), vec!["/login".to_string()]);

        let nav = RecordingNavigator::at("/login");
        assert!(gate.guard(&nav).is_none());
        assert!(nav.visited.lock().unwrap().is_empty());
    }

    #[test]
    fn chrome_follows_session() {
        let token = issue_token("user-1", Some("a@b.c"), Duration::hours(1), "s").unwrap();
        let session = Session::from_id_token(&token).unwrap();

        let signed_in = NavChrome::for_session(Some(&session));
        assert!(!signed_in.show_login_link);
        assert!(signed_in.show_logout);
        assert_eq!(signed_in.user_info, "Signed in as a@b.c");

        let signed_out = NavChrome::for_session(None);
        assert!(signed_out.show_login_link);
        assert!(signed_out.user_info.is_empty());
    }

    #[tokio::test]
    async fn session_changes_are_observed() {
        let gate = SessionGate::new("/login");
        let mut changes = gate.on_session_change();
        assert!(changes.borrow().is_none());

        let token = issue_token("user-1", None, Duration::hours(1), "s").unwrap();
        gate.sign_in(&token).unwrap();
        changes.changed().await.unwrap();
        assert!(changes.borrow().is_some());

        gate.sign_out();
        changes.changed().await.unwrap();
        assert!(changes.borrow().is_none());
    }

    #[tokio::test]
    async fn credential_without_session_is_unauthenticated() {
        let gate = SessionGate::new("/login");
        assert!(matches!(
            gate.credential().await,
            Err(DashboardError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let gate = SessionGate::new("/login").with_token_source(source.clone());
        let stale = issue_token("user-1", None, Duration::seconds(-60), "s").unwrap();
        gate.sign_in(&stale).unwrap();

        let fresh = gate.credential().await.unwrap();
        assert_ne!(fresh, stale);
        assert_eq!(gate.credential().await.unwrap(), fresh);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_without_source_fails() {
        let gate = SessionGate::new("/login");
        let stale = issue_token("user-1", None, Duration::seconds(-60), "s").unwrap();
        gate.sign_in(&stale).unwrap();
        let err = gate.credential().await.unwrap_err();
        assert_eq!(err.user_message(), "Server error.");
    }
}
