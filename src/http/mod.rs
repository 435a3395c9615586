//! Shared REST client
//!
//! Every call to the backend goes through [`ApiClient`]:
//! - a `Bearer` authorization header is attached whenever a token is held
//! - the active display locale is attached as a `lang` query parameter
//! - the uniform `{data, code, message}` envelope is unwrapped, so callers
//!   see either the payload or a classified [`ApiError`]
//!
//! The token and locale live in shared slots (`Arc<RwLock<...>>`) so the
//! session manager can swap them without rebuilding the client. The client
//! itself is cheap to clone.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::i18n::{Locale, LocalizedText};

/// Errors produced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend processed the request and rejected it; `message` carries
    /// the localized text meant for display.
    #[error("request rejected by backend (code {code}): {message}")]
    Api { code: i64, message: LocalizedText },

    /// Connection, DNS, TLS or timeout failure; retryable from the
    /// caller's point of view.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected envelope shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The envelope was well-formed but carried no `data` where the caller
    /// expected a payload.
    #[error("response envelope contained no data")]
    EmptyData,
}

impl ApiError {
    /// Whether this error means the current token was not accepted.
    ///
    /// Rejections always arrive as `Api` errors: `send` decodes non-2xx
    /// bodies itself (enveloped or not) instead of surfacing HTTP statuses
    /// through `reqwest`, so only the body code matters here.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Api { code, .. } if *code == 401 || *code == 403)
    }

    /// Localized display text for this error, if the backend provided one.
    pub fn display_message(&self, locale: Locale) -> Option<String> {
        match self {
            ApiError::Api { message, .. } => Some(message.resolve(locale).to_string()),
            _ => None,
        }
    }
}

/// Uniform backend response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
    code: i64,
    #[serde(default)]
    message: Option<LocalizedText>,
}

/// REST client shared by the session manager and the dictionary cache.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
    locale: Arc<RwLock<Locale>>,
}

impl ApiClient {
    /// Build a client from configuration.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
            locale: Arc::new(RwLock::new(config.api.default_locale)),
        })
    }

    /// Snapshot of the currently held bearer token.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replace the bearer token used for subsequent requests.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// Currently active display locale.
    pub async fn locale(&self) -> Locale {
        *self.locale.read().await
    }

    /// Switch the locale attached to subsequent requests.
    pub async fn set_locale(&self, locale: Locale) {
        *self.locale.write().await = locale;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET` a payload-bearing endpoint.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let req = self.http.get(self.url(path)).query(query);
        self.send(req).await?.data.ok_or(ApiError::EmptyData)
    }

    /// `POST` a JSON body and decode the `data` payload.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.http.post(self.url(path)).json(body);
        self.send(req).await?.data.ok_or(ApiError::EmptyData)
    }

    /// `POST` a JSON body to an endpoint whose success response carries no
    /// payload (`data` is null or absent).
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let req = self.http.post(self.url(path)).json(body);
        self.send::<serde_json::Value>(req).await?;
        Ok(())
    }

    /// Attach locale and token, execute, and unwrap the envelope.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Envelope<T>, ApiError> {
        let lang = self.locale().await;
        let mut req = req.query(&[("lang", lang.as_str())]);

        if let Some(token) = self.token.read().await.as_deref() {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        let envelope: Envelope<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(err) => {
                // Error responses from proxies or crashes are not enveloped;
                // surface them as a backend rejection with the raw body.
                if !status.is_success() {
                    return Err(ApiError::Api {
                        code: i64::from(status.as_u16()),
                        message: LocalizedText::Plain(
                            String::from_utf8_lossy(&body).trim().to_string(),
                        ),
                    });
                }
                return Err(ApiError::Decode(err));
            }
        };

        if !status.is_success() || !(200..300).contains(&envelope.code) {
            tracing::debug!(code = envelope.code, status = %status, "backend rejected request");
            return Err(ApiError::Api {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        Ok(envelope)
    }
}
