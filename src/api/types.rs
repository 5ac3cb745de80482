//! Shared state for the function routes.

use std::path::Path;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::config::{
    ConfigError, DatabaseTarget, Settings, ENV_DATABASE_SERVICE_KEY, ENV_DATABASE_URL,
    ENV_FIREBASE_SERVICE_ACCOUNT, ENV_GEMINI_API_KEY,
};
use crate::db::{DonorDirectory, MedicalEventStore, PostgrestStore, SqliteStore, StoreError};
use crate::notify::{FanoutConfig, FcmGateway, PushError, PushGateway, RetryPolicy, ServiceAccount, TokenProvider};
use crate::pipeline::model::{GeminiClient, GenerativeModel, ModelError};

/// A collaborator, or the configuration error explaining its absence.
type Slot<T> = Result<Arc<T>, ConfigError>;

/// Failure to build a collaborator from values that are present but
/// unusable. Raised at startup, never per request.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Model client: {0}")]
    Model(#[from] ModelError),

    #[error("Store: {0}")]
    Store(#[from] StoreError),

    #[error("Push gateway: {0}")]
    Push(#[from] PushError),
}

/// Collaborators shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    model: Slot<dyn GenerativeModel>,
    events: Slot<dyn MedicalEventStore>,
    donors: Slot<dyn DonorDirectory>,
    push: Slot<dyn PushGateway>,
    pub fanout: FanoutConfig,
}

impl ApiContext {
    /// Context with nothing configured. Each accessor reports the
    /// variable that would enable it.
    pub fn unconfigured() -> Self {
        Self {
            model: Err(ConfigError::Missing(ENV_GEMINI_API_KEY)),
            events: Err(ConfigError::Missing(ENV_DATABASE_URL)),
            donors: Err(ConfigError::Missing(ENV_DATABASE_URL)),
            push: Err(ConfigError::Missing(ENV_FIREBASE_SERVICE_ACCOUNT)),
            fanout: FanoutConfig::default(),
        }
    }

    /// Build every collaborator the settings allow. Missing secrets leave
    /// the collaborator unset; malformed values are an error.
    pub fn from_settings(settings: &Settings) -> Result<Self, ContextError> {
        let mut ctx = Self::unconfigured();
        ctx.fanout = FanoutConfig {
            concurrency: settings.fanout_concurrency,
            retry: RetryPolicy::default(),
        };

        if let Some(key) = &settings.gemini_api_key {
            let client = GeminiClient::new(
                &settings.gemini_base_url,
                key,
                &settings.gemini_model,
                settings.model_timeout,
            )?;
            ctx = ctx.with_model(Arc::new(client));
        }

        match &settings.database {
            None => {}
            Some(DatabaseTarget::SqliteMemory) => {
                ctx = ctx.with_sqlite(SqliteStore::open_in_memory()?);
            }
            Some(DatabaseTarget::SqliteFile(path)) => {
                ctx = ctx.with_sqlite(SqliteStore::open(Path::new(path))?);
            }
            Some(DatabaseTarget::Rest(url)) => match &settings.database_service_key {
                Some(key) => {
                    let store = Arc::new(PostgrestStore::new(url, key, settings.store_timeout)?);
                    ctx.events = Ok(store.clone());
                    ctx.donors = Ok(store);
                }
                None => {
                    ctx.events = Err(ConfigError::Missing(ENV_DATABASE_SERVICE_KEY));
                    ctx.donors = Err(ConfigError::Missing(ENV_DATABASE_SERVICE_KEY));
                }
            },
        }

        if let Some(raw) = &settings.firebase_service_account {
            let account = ServiceAccount::from_json(raw)?;
            let tokens = Arc::new(TokenProvider::new(account, settings.push_timeout)?);
            ctx = ctx.with_push(Arc::new(FcmGateway::new(tokens, settings.push_timeout)?));
        }

        for (name, missing) in [
            ("model", ctx.model.as_ref().err()),
            ("store", ctx.events.as_ref().err()),
            ("push", ctx.push.as_ref().err()),
        ] {
            if let Some(e) = missing {
                tracing::warn!(collaborator = name, reason = %e, "Collaborator not configured");
            }
        }

        Ok(ctx)
    }

    pub fn with_model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.model = Ok(model);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn MedicalEventStore>) -> Self {
        self.events = Ok(events);
        self
    }

    pub fn with_donors(mut self, donors: Arc<dyn DonorDirectory>) -> Self {
        self.donors = Ok(donors);
        self
    }

    /// One SQLite store serving both events and donors.
    pub fn with_sqlite(self, store: SqliteStore) -> Self {
        let store = Arc::new(store);
        self.with_events(store.clone()).with_donors(store)
    }

    pub fn with_push(mut self, push: Arc<dyn PushGateway>) -> Self {
        self.push = Ok(push);
        self
    }

    pub fn with_fanout(mut self, fanout: FanoutConfig) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn model(&self) -> Result<Arc<dyn GenerativeModel>, ApiError> {
        slot(&self.model)
    }

    pub fn events(&self) -> Result<Arc<dyn MedicalEventStore>, ApiError> {
        slot(&self.events)
    }

    pub fn donors(&self) -> Result<Arc<dyn DonorDirectory>, ApiError> {
        slot(&self.donors)
    }

    pub fn push(&self) -> Result<Arc<dyn PushGateway>, ApiError> {
        slot(&self.push)
    }

    pub fn model_configured(&self) -> bool {
        self.model.is_ok()
    }

    pub fn store_configured(&self) -> bool {
        self.events.is_ok() && self.donors.is_ok()
    }

    pub fn push_configured(&self) -> bool {
        self.push.is_ok()
    }
}

fn slot<T: ?Sized>(slot: &Slot<T>) -> Result<Arc<T>, ApiError> {
    slot.clone().map_err(ApiError::Config)
}
