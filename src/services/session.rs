//! Session management
//!
//! `SessionManager` is the single source of truth for "who is logged in"
//! and the only component allowed to write or delete the stored token.
//!
//! Invariants:
//! - the identity is never considered valid without a verified token: any
//!   failure of the identity lookup discards the token and clears the
//!   identity (tokens expiring is routine, not an error)
//! - the token is persisted under the fixed `token` storage key as a raw
//!   string, created only by a successful credential exchange and destroyed
//!   only by `logout` or an identity-lookup failure

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::http::{ApiClient, ApiError};
use crate::i18n::{Locale, LocalizedText};
use crate::models::UserIdentity;
use crate::storage::{keys, KeyValueStore};

/// Error types for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The entrance classification call failed; the login flow cannot
    /// know which secret kind the backend expects.
    #[error("could not verify identifier")]
    Classification(#[source] ApiError),

    /// The backend rejected the supplied password or one-time code.
    #[error("credentials rejected: {message}")]
    CredentialsRejected { message: LocalizedText },

    /// Transport-level failure; nothing was mutated, the operation is
    /// retryable.
    #[error("network failure")]
    Network(#[source] ApiError),

    /// Internal error (storage failure, unexpected response shape)
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SessionError {
    /// Classify an error coming back from a credential exchange.
    fn from_credential_call(err: ApiError) -> Self {
        match err {
            ApiError::Api { message, .. } => SessionError::CredentialsRejected { message },
            other => SessionError::Network(other),
        }
    }

    /// Text suitable for showing to the user in the given locale.
    pub fn display_message(&self, locale: Locale) -> String {
        match self {
            SessionError::Classification(_) => match locale {
                Locale::Ru => "Не удалось проверить идентификатор".to_string(),
                Locale::Kk => "Идентификаторды тексеру мүмкін болмады".to_string(),
                Locale::En => "Could not verify identifier".to_string(),
            },
            SessionError::CredentialsRejected { message } => message.resolve(locale).to_string(),
            SessionError::Network(_) => match locale {
                Locale::Ru => "Ошибка сети, попробуйте ещё раз".to_string(),
                Locale::Kk => "Желі қатесі, қайталап көріңіз".to_string(),
                Locale::En => "Network error, please try again".to_string(),
            },
            SessionError::Internal(_) => match locale {
                Locale::Ru => "Внутренняя ошибка".to_string(),
                Locale::Kk => "Ішкі қате".to_string(),
                Locale::En => "Internal error".to_string(),
            },
        }
    }
}

/// Which secret the backend expects for a given identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Password,
    OneTimeCode,
}

/// A credential supplied by the user.
#[derive(Debug, Clone)]
pub enum Secret {
    Password(String),
    OneTimeCode(String),
}

impl Secret {
    pub fn kind(&self) -> SecretKind {
        match self {
            Secret::Password(_) => SecretKind::Password,
            Secret::OneTimeCode(_) => SecretKind::OneTimeCode,
        }
    }
}

/// Result of the entrance classification query.
#[derive(Debug, Clone, Copy)]
pub struct Entrance {
    /// Whether the identifier belongs to an existing account
    pub exists: bool,
    /// Secret kind the backend expects next
    pub kind: SecretKind,
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Debug, Serialize)]
struct EntranceRequest<'a> {
    login: &'a str,
}

#[derive(Debug, Deserialize)]
struct EntranceResponse {
    #[serde(default)]
    exists: bool,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Serialize)]
struct PasswordLoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    phone_number: &'a str,
}

#[derive(Debug, Serialize)]
struct OtpVerifyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    otp_code: &'a str,
}

#[derive(Debug, Serialize)]
struct ResetRequest<'a> {
    login: &'a str,
}

#[derive(Debug, Serialize)]
struct ResetConfirmRequest<'a> {
    target: &'a str,
    otp_code: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Serialize)]
struct ChangePasswordRequest<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

// ============================================================================
// Session manager
// ============================================================================

/// Owner of the authentication token and the resolved identity.
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    identity: RwLock<Option<UserIdentity>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            identity: RwLock::new(None),
        }
    }

    /// Restore a persisted session at startup.
    ///
    /// Loads the stored token into the client and verifies it with one
    /// identity lookup. Returns the resolved identity, or `None` when no
    /// token is stored or the stored token is no longer accepted (in which
    /// case it has been discarded).
    pub async fn init(&self) -> Result<Option<UserIdentity>, SessionError> {
        let token = self.store.get(keys::TOKEN).await?;
        if token.is_none() {
            return Ok(None);
        }
        self.api.set_token(token).await;
        self.refresh_identity().await
    }

    /// Resolve the current identity.
    ///
    /// No token means no network call and `None`. With a token, a memoized
    /// identity from an earlier lookup is returned directly (it is
    /// invalidated on every token change); otherwise exactly one
    /// `GET /auth/me` is performed. Any lookup failure discards the token
    /// and yields `None` - an expired token is not an error.
    pub async fn current_identity(&self) -> Result<Option<UserIdentity>, SessionError> {
        if self.api.token().await.is_none() {
            return Ok(None);
        }
        if let Some(identity) = self.identity.read().await.clone() {
            return Ok(Some(identity));
        }
        self.refresh_identity().await
    }

    /// Force a fresh identity lookup, bypassing the memo.
    pub async fn refresh_identity(&self) -> Result<Option<UserIdentity>, SessionError> {
        let Some(token_used) = self.api.token().await else {
            *self.identity.write().await = None;
            return Ok(None);
        };

        match self.api.get::<UserIdentity>("/auth/me", &[]).await {
            Ok(identity) => {
                *self.identity.write().await = Some(identity.clone());
                Ok(Some(identity))
            }
            Err(err) => {
                tracing::debug!(error = %err, "identity lookup failed, dropping session");
                // A late rejection of a superseded token must not tear down
                // a session established afterwards; logout stays
                // authoritative over in-flight requests.
                let stored = self.store.get(keys::TOKEN).await?;
                if stored.as_deref() == Some(token_used.as_str())
                    || self.api.token().await.as_deref() == Some(token_used.as_str())
                {
                    self.clear_session().await;
                }
                Ok(None)
            }
        }
    }

    /// Exchange credentials for a token.
    ///
    /// On success the token is persisted and the identity refreshed;
    /// `Ok(Some(identity))` is the normal outcome. `Ok(None)` means the
    /// credential exchange succeeded but the follow-up identity lookup did
    /// not - the token has already been discarded per the session
    /// invariant. On failure the stored token is untouched.
    pub async fn login(
        &self,
        target: &str,
        secret: Secret,
    ) -> Result<Option<UserIdentity>, SessionError> {
        let token = match &secret {
            Secret::Password(password) => {
                let resp: TokenResponse = self
                    .api
                    .post(
                        "/auth/login-json",
                        &PasswordLoginRequest {
                            login: target,
                            password,
                        },
                    )
                    .await
                    .map_err(SessionError::from_credential_call)?;
                resp.access_token
            }
            Secret::OneTimeCode(code) => self.verify_one_time_code(target, code).await?,
        };

        self.install_token(token).await?;
        self.refresh_identity().await
    }

    /// Drop the session unconditionally.
    ///
    /// Best-effort and infallible: a storage hiccup is logged, the
    /// in-memory state is cleared regardless. The backend keeps no session
    /// record to invalidate.
    pub async fn logout(&self) {
        if let Err(err) = self.store.remove(keys::TOKEN).await {
            tracing::warn!(error = %err, "failed to remove stored token");
        }
        self.api.set_token(None).await;
        *self.identity.write().await = None;
    }

    /// Ask the backend which secret kind it expects for `target`.
    ///
    /// The classification is authoritative; anything the client does not
    /// recognize (legacy backends answered "pin" here) falls back to the
    /// code-based path, the lowest-friction option.
    pub async fn check_entrance(&self, target: &str) -> Result<Entrance, SessionError> {
        let resp: EntranceResponse = self
            .api
            .post("/auth/check-entrance", &EntranceRequest { login: target })
            .await
            .map_err(SessionError::Classification)?;

        let kind = match resp.kind.as_deref() {
            Some("password") => SecretKind::Password,
            Some("otp") | None => SecretKind::OneTimeCode,
            Some(other) => {
                tracing::warn!(kind = other, "unknown entrance type, falling back to OTP");
                SecretKind::OneTimeCode
            }
        };

        Ok(Entrance {
            exists: resp.exists,
            kind,
        })
    }

    /// Ask the backend to dispatch a one-time code to `target`.
    ///
    /// Safe to repeat; rate limiting is the backend's concern and no local
    /// flow state is touched.
    pub async fn request_one_time_code(&self, target: &str) -> Result<(), SessionError> {
        self.api
            .post_unit("/auth/otp/request", &OtpRequest { phone_number: target })
            .await
            .map_err(SessionError::from_credential_call)
    }

    /// Verify a one-time code and return the issued bearer token.
    ///
    /// Purpose-agnostic: the login flow installs the returned token, the
    /// password-recovery flow only needs the confirmation. Codes are
    /// single-use; a second verification with the same code is rejected by
    /// the backend and surfaces as `CredentialsRejected`.
    pub async fn verify_one_time_code(
        &self,
        target: &str,
        code: &str,
    ) -> Result<String, SessionError> {
        // Targets with an @ are emails, everything else is a phone number
        let (phone_number, email) = if target.contains('@') {
            (None, Some(target))
        } else {
            (Some(target), None)
        };

        let resp: TokenResponse = self
            .api
            .post(
                "/auth/otp/verify",
                &OtpVerifyRequest {
                    phone_number,
                    email,
                    otp_code: code,
                },
            )
            .await
            .map_err(SessionError::from_credential_call)?;

        Ok(resp.access_token)
    }

    /// Start password recovery: dispatch a reset code to `target`.
    pub async fn request_password_reset(&self, target: &str) -> Result<(), SessionError> {
        self.api
            .post_unit("/auth/password/reset/request", &ResetRequest { login: target })
            .await
            .map_err(SessionError::from_credential_call)
    }

    /// Finish password recovery with the code received out-of-band.
    pub async fn confirm_password_reset(
        &self,
        target: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        self.api
            .post_unit(
                "/auth/password/reset/confirm",
                &ResetConfirmRequest {
                    target,
                    otp_code: code,
                    new_password,
                },
            )
            .await
            .map_err(SessionError::from_credential_call)
    }

    /// Change the password of the authenticated user.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        self.api
            .post_unit(
                "/auth/password/change",
                &ChangePasswordRequest {
                    old_password,
                    new_password,
                },
            )
            .await
            .map_err(SessionError::from_credential_call)
    }

    /// Persist a freshly issued token and invalidate the identity memo.
    async fn install_token(&self, token: String) -> Result<(), SessionError> {
        self.store.set(keys::TOKEN, &token).await?;
        self.api.set_token(Some(token)).await;
        *self.identity.write().await = None;
        Ok(())
    }

    /// Drop token and identity together (identity-lookup failure path).
    async fn clear_session(&self) {
        if let Err(err) = self.store.remove(keys::TOKEN).await {
            tracing::warn!(error = %err, "failed to remove stored token");
        }
        self.api.set_token(None).await;
        *self.identity.write().await = None;
    }
}
