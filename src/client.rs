//! Top-level client facade
//!
//! `ProkatClient` wires the durable store, the HTTP client and the two
//! services into one explicitly constructed context object. There is no
//! ambient global state: tests (and embedders) build a fresh client per
//! use, which keeps the single logical owner of the token.

use std::sync::Arc;

use crate::config::Config;
use crate::http::{ApiClient, ApiError};
use crate::i18n::Locale;
use crate::models::UserIdentity;
use crate::services::{DictionaryService, LoginFlow, SessionError, SessionManager};
use crate::storage::{keys, KeyValueStore};

/// Assembled marketplace client.
pub struct ProkatClient {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    session: Arc<SessionManager>,
    dictionaries: DictionaryService,
}

impl std::fmt::Debug for ProkatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProkatClient").finish_non_exhaustive()
    }
}

impl ProkatClient {
    /// Build a client over an existing store.
    ///
    /// A locale persisted under the `lang` key overrides the configured
    /// default, so the user's language choice survives restarts.
    pub async fn new(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config)?;

        match store.get(keys::LANG).await {
            Ok(Some(saved)) => match saved.parse::<Locale>() {
                Ok(locale) => api.set_locale(locale).await,
                Err(_) => tracing::warn!(value = %saved, "ignoring unknown persisted locale"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to read persisted locale"),
        }

        let session = Arc::new(SessionManager::new(api.clone(), store.clone()));
        let dictionaries = DictionaryService::new(api.clone(), store.clone());

        Ok(Self {
            api,
            store,
            session,
            dictionaries,
        })
    }

    /// Build a client with the store described by the configuration.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = crate::storage::create_store(&config.storage).await?;
        Ok(Self::new(config, store).await?)
    }

    /// Restore a persisted session, if any. Call once at startup.
    pub async fn init(&self) -> Result<Option<UserIdentity>, SessionError> {
        self.session.init().await
    }

    /// Session operations (login, logout, identity, OTP, passwords).
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Cached reference data.
    pub fn dictionaries(&self) -> &DictionaryService {
        &self.dictionaries
    }

    /// Begin a login attempt.
    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(self.session.clone())
    }

    /// Active display locale.
    pub async fn locale(&self) -> Locale {
        self.api.locale().await
    }

    /// Switch the display locale.
    ///
    /// Persists the choice under the `lang` key, routes subsequent
    /// requests through the new `lang` parameter, and drops every cached
    /// dictionary - cached names are in the old language.
    pub async fn set_locale(&self, locale: Locale) {
        if let Err(err) = self.store.set(keys::LANG, locale.as_str()).await {
            tracing::warn!(error = %err, "failed to persist locale");
        }
        self.api.set_locale(locale).await;
        self.dictionaries.invalidate_all().await;
    }
}
