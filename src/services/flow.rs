//! Multi-step login flow
//!
//! Drives the adaptive login UI: collect an identifier, let the backend
//! classify which secret it expects, collect that secret, verify. Each
//! phase is its own variant carrying only the data valid in that phase,
//! so illegal field combinations cannot be represented.
//!
//! Rejected secrets return the flow to `CollectingSecret` with the same
//! target and the same kind - the flow never switches modes on its own;
//! only the backend classification picks the mode.

use std::sync::Arc;

use crate::models::UserIdentity;
use crate::services::session::{Secret, SecretKind, SessionError, SessionManager};

/// Phase of one login attempt.
#[derive(Debug, Clone)]
pub enum Phase {
    /// Waiting for the user to enter a phone/email/login.
    /// `target` keeps the previous entry after a restart for convenience.
    CollectingIdentifier { target: Option<String> },
    /// Identifier classified; waiting for the matching secret.
    CollectingSecret { target: String, kind: SecretKind },
    /// Credential exchange in flight.
    Verifying { target: String, kind: SecretKind },
    /// Logged in.
    Succeeded {
        target: String,
        identity: UserIdentity,
    },
}

/// Error types for flow operations.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The operation is not valid in the current phase.
    #[error("operation is not valid in the current phase")]
    WrongPhase,

    /// A password was submitted where a code is expected, or vice versa.
    /// The backend classification is authoritative; the flow rejects the
    /// mismatching operation without a network call.
    #[error("the backend expects a different secret kind ({expected:?})")]
    WrongSecretKind { expected: SecretKind },

    /// The underlying session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// State machine for one login attempt.
pub struct LoginFlow {
    session: Arc<SessionManager>,
    phase: Phase,
}

impl LoginFlow {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            phase: Phase::CollectingIdentifier { target: None },
        }
    }

    /// Current phase, for rendering.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The identifier of the attempt, wherever the flow currently is.
    pub fn target(&self) -> Option<&str> {
        match &self.phase {
            Phase::CollectingIdentifier { target } => target.as_deref(),
            Phase::CollectingSecret { target, .. }
            | Phase::Verifying { target, .. }
            | Phase::Succeeded { target, .. } => Some(target),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.phase, Phase::Succeeded { .. })
    }

    /// Submit the identifier and let the backend classify it.
    ///
    /// Advances to `CollectingSecret` with the backend-chosen kind. On a
    /// classification failure the flow stays at `CollectingIdentifier`
    /// (keeping the entered target) and the error is surfaced.
    ///
    /// For code-based targets the backend dispatches the code as part of
    /// classification; no separate request is needed, `resend_code` covers
    /// re-dispatch.
    pub async fn submit_identifier(&mut self, target: &str) -> Result<SecretKind, FlowError> {
        if !matches!(self.phase, Phase::CollectingIdentifier { .. }) {
            return Err(FlowError::WrongPhase);
        }

        match self.session.check_entrance(target).await {
            Ok(entrance) => {
                self.phase = Phase::CollectingSecret {
                    target: target.to_string(),
                    kind: entrance.kind,
                };
                Ok(entrance.kind)
            }
            Err(err) => {
                self.phase = Phase::CollectingIdentifier {
                    target: Some(target.to_string()),
                };
                Err(err.into())
            }
        }
    }

    /// Submit the password for a password-classified target.
    pub async fn submit_password(&mut self, password: &str) -> Result<UserIdentity, FlowError> {
        self.submit_secret(Secret::Password(password.to_string())).await
    }

    /// Submit the one-time code for a code-classified target.
    pub async fn submit_code(&mut self, code: &str) -> Result<UserIdentity, FlowError> {
        self.submit_secret(Secret::OneTimeCode(code.to_string())).await
    }

    /// Ask the backend to dispatch the code again.
    pub async fn resend_code(&self) -> Result<(), FlowError> {
        match &self.phase {
            Phase::CollectingSecret {
                target,
                kind: SecretKind::OneTimeCode,
            } => {
                self.session.request_one_time_code(target).await?;
                Ok(())
            }
            _ => Err(FlowError::WrongPhase),
        }
    }

    /// Return to identifier entry from any phase.
    ///
    /// Secrets are discarded; the target is kept so the user does not have
    /// to retype it.
    pub fn restart(&mut self) {
        let target = self.target().map(str::to_string);
        self.phase = Phase::CollectingIdentifier { target };
    }

    async fn submit_secret(&mut self, secret: Secret) -> Result<UserIdentity, FlowError> {
        let (target, kind) = match &self.phase {
            Phase::CollectingSecret { target, kind } => (target.clone(), *kind),
            _ => return Err(FlowError::WrongPhase),
        };
        if secret.kind() != kind {
            return Err(FlowError::WrongSecretKind { expected: kind });
        }

        self.phase = Phase::Verifying {
            target: target.clone(),
            kind,
        };

        match self.session.login(&target, secret).await {
            Ok(Some(identity)) => {
                self.phase = Phase::Succeeded {
                    target,
                    identity: identity.clone(),
                };
                Ok(identity)
            }
            Ok(None) => {
                // Token accepted but the identity lookup failed and the
                // session was already torn down; treat like a failed
                // attempt and let the user retry.
                self.phase = Phase::CollectingSecret { target, kind };
                Err(FlowError::Session(SessionError::Internal(anyhow::anyhow!(
                    "identity lookup failed after credential exchange"
                ))))
            }
            Err(err) => {
                // Same phase, same kind: rejection never switches modes
                self.phase = Phase::CollectingSecret { target, kind };
                Err(err.into())
            }
        }
    }
}
