//! Application state: injected document store, prompts, optional generator.
//!
//! Built once by the bootstrap layer and shared read-only across requests.
//! Nothing here is mutated after startup; the store handles its own locking.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::{load_prompt_config_from_env, Prompts};
use crate::generator::Generator;
use crate::store::{DocumentStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub generator: Option<Generator>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load prompts, init the generator, open the store.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let prompts = load_prompt_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        // Build optional generator (if API key present).
        let generator = Generator::from_env();
        if let Some(g) = &generator {
            info!(target: "assessment_backend", base_url = %g.base_url, model = %g.model, timeout = ?g.timeout, "Generation enabled.");
        } else {
            info!(target: "assessment_backend", "Generation disabled (no OPENAI_API_KEY). Stored assessments remain available.");
        }

        Self::new(Arc::new(MemoryStore::new()), generator, prompts)
    }

    pub fn new(store: Arc<dyn DocumentStore>, generator: Option<Generator>, prompts: Prompts) -> Self {
        Self { store, generator, prompts }
    }
}
