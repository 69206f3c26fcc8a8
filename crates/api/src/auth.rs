//! Admin authentication with opaque bearer tokens.
//!
//! Tokens are random UUIDs held in an in-memory registry together with their
//! kind and expiry. Login attempts are rate limited per client address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use domain::{Check, Validate, trim};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::{Config, MAX_TOKEN_TTL};
use crate::error::ApiError;
use crate::{AppState, Storefront};

/// Errors raised while authenticating a request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("missing or malformed authorization header")]
    MissingToken,

    #[error("too many login attempts, try again later")]
    RateLimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone)]
struct TokenEntry {
    kind: TokenKind,
    subject: String,
    expires_at: Instant,
}

impl TokenEntry {
    fn is_live(&self, kind: TokenKind, now: Instant) -> bool {
        self.kind == kind && now < self.expires_at
    }
}

/// Tokens issued on a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The authenticated admin attached to protected requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub username: String,
}

/// Issues and verifies admin tokens.
pub struct Authenticator {
    username: String,
    password: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    tokens: RwLock<HashMap<String, TokenEntry>>,
}

impl Authenticator {
    pub fn new(config: &Config) -> Self {
        Self {
            username: config.admin_username.clone(),
            password: config.admin_password.clone(),
            access_ttl: config.access_token_ttl.min(MAX_TOKEN_TTL),
            refresh_ttl: config.refresh_token_ttl.min(MAX_TOKEN_TTL),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Checks the credentials and issues a fresh token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        if username != self.username || password != self.password {
            tracing::warn!(%username, "rejected login");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Instant::now();
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, entry| now < entry.expires_at);

        let access_token = issue(
            &mut tokens,
            TokenKind::Access,
            username,
            expiry(now, self.access_ttl),
        );
        let refresh_token = issue(
            &mut tokens,
            TokenKind::Refresh,
            username,
            expiry(now, self.refresh_ttl),
        );

        tracing::info!(%username, "admin logged in");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchanges a live refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let now = Instant::now();
        let mut tokens = self.tokens.write().await;

        let subject = match tokens.get(refresh_token) {
            Some(entry) if entry.is_live(TokenKind::Refresh, now) => entry.subject.clone(),
            _ => return Err(AuthError::InvalidToken),
        };

        Ok(issue(
            &mut tokens,
            TokenKind::Access,
            &subject,
            expiry(now, self.access_ttl),
        ))
    }

    /// Returns the session behind a live access token.
    pub async fn verify(&self, access_token: &str) -> Result<AdminSession, AuthError> {
        let tokens = self.tokens.read().await;
        match tokens.get(access_token) {
            Some(entry) if entry.is_live(TokenKind::Access, Instant::now()) => Ok(AdminSession {
                username: entry.subject.clone(),
            }),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

/// Saturates at `MAX_TOKEN_TTL` when `now + ttl` is not representable.
fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(MAX_TOKEN_TTL))
        .unwrap_or(now)
}

fn issue(
    tokens: &mut HashMap<String, TokenEntry>,
    kind: TokenKind,
    subject: &str,
    expires_at: Instant,
) -> String {
    let token = Uuid::new_v4().to_string();
    tokens.insert(
        token.clone(),
        TokenEntry {
            kind,
            subject: subject.to_string(),
            expires_at,
        },
    );
    token
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Fixed-window counter keyed by client address.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Allows `limit_per_minute` hits per client and minute.
    pub fn per_minute(limit_per_minute: u32) -> Self {
        Self::new(limit_per_minute, Duration::from_secs(60))
    }

    /// Records a hit and reports whether it is within the limit.
    pub async fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        clients.retain(|_, w| now.duration_since(w.started) < self.window);

        let window = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });
        window.hits += 1;
        window.hits <= self.limit
    }
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn sanitize(&mut self) {
        trim(&mut self.username);
        trim(&mut self.password);
    }

    fn rules(&self) -> Vec<Check<'_>> {
        vec![
            Check::text("username", &self.username).required(),
            Check::text("password", &self.password).required(),
        ]
    }
}

/// Body of `POST /refresh-token`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn sanitize(&mut self) {
        trim(&mut self.refresh_token);
    }

    fn rules(&self) -> Vec<Check<'_>> {
        vec![Check::text("refresh_token", &self.refresh_token).required()]
    }
}

/// Middleware rejecting requests without a live access token.
pub async fn require_bearer<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;
    let session = state.auth.verify(&token).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Middleware applying the login rate limit.
pub async fn limit_login<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    if !state.login_limiter.check(&client).await {
        tracing::warn!(%client, "login rate limit exceeded");
        return Err(AuthError::RateLimited.into());
    }
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Identifies the client by its forwarded or peer address.
fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(addr) => addr.to_string(),
        None => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}
