//! Application state: live wizard sessions, the draft store, defaults, and
//! the optional generation client.
//!
//! This module owns:
//!   - the session map (draft key -> running state machine)
//!   - the injected `DraftStore` behind every machine
//!   - wizard defaults (from TOML or built-in)
//!   - optional generation service client
//!
//! Sessions are created lazily: any operation naming an unknown draft key
//! resumes (or freshly creates) a machine for it, so a reconnecting client
//! never has to re-run an explicit start handshake.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::config::{load_planner_config_from_env, WizardDefaults};
use crate::generation::GenerationClient;
use crate::persist::{DraftStore, FileDraftStore};
use crate::wizard::{WizardStateMachine, WizardVariant};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, WizardStateMachine>>>,
    pub store: Arc<dyn DraftStore>,
    pub defaults: WizardDefaults,
    pub generation: Option<GenerationClient>,
}

impl AppState {
    /// Build state from env: load config, open the draft store, init the
    /// generation client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let defaults = load_planner_config_from_env()
            .map(|c| c.defaults)
            .unwrap_or_default();

        let store: Arc<dyn DraftStore> = Arc::new(FileDraftStore::from_env());

        let generation = GenerationClient::from_env();
        if let Some(g) = &generation {
            info!(target: "studyplan_backend", base_url = %g.base_url, "Generation service enabled.");
        } else {
            info!(target: "studyplan_backend", "Generation service disabled (no GENERATION_API_URL). Generate requests will be rejected.");
        }

        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            defaults,
            generation,
        }
    }

    #[cfg(test)]
    pub fn for_tests(store: Arc<dyn DraftStore>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            defaults: WizardDefaults::default(),
            generation: None,
        }
    }

    /// Run `f` against the machine for `key`, resuming or creating it first.
    /// The default (gated) variant is used for implicitly created sessions.
    pub async fn with_wizard<R>(&self, key: &str, f: impl FnOnce(&mut WizardStateMachine) -> R) -> R {
        let mut sessions = self.sessions.write().await;
        let machine = sessions.entry(key.to_string()).or_insert_with(|| {
            WizardStateMachine::resume_or_new(
                self.store.clone(),
                key,
                WizardVariant::Gated,
                &self.defaults,
            )
        });
        f(machine)
    }

    /// Explicit session start with a chosen variant; replaces any live
    /// session for the key (the draft itself is loaded from the store, so
    /// nothing user-entered is lost).
    #[instrument(level = "info", skip(self))]
    pub async fn start_wizard(&self, key: &str, variant: WizardVariant) {
        let machine =
            WizardStateMachine::resume_or_new(self.store.clone(), key, variant, &self.defaults);
        self.sessions.write().await.insert(key.to_string(), machine);
    }

    /// Drop the live session for `key`. The stored draft is untouched; use
    /// the machine's own `finish()` to clear it.
    pub async fn close_wizard(&self, key: &str) {
        self.sessions.write().await.remove(key);
        info!(target: "wizard", %key, "Session closed");
    }
}
