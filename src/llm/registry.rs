use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, ProviderEntry};
use crate::errors::{VizCueError, VizCueResult};
use crate::llm::provider::VisionModel;
use crate::llm::providers::OpenAiCompatibleVision;
use crate::llm::types::CallConfig;
use crate::parser::ModelFamily;

/// The active vision model and the providers it can be switched between.
/// Owned by the engine; handed out as `Arc` snapshots to request workers.
pub struct ModelSession {
    entries: HashMap<String, ProviderEntry>,
    models: HashMap<String, Arc<dyn VisionModel>>,
    active: String,
}

impl ModelSession {
    pub fn new(active: String) -> Self {
        Self {
            entries: HashMap::new(),
            models: HashMap::new(),
            active,
        }
    }

    pub fn register(&mut self, model: Arc<dyn VisionModel>) {
        self.models.insert(model.name().to_string(), model);
    }

    /// Build a session from the loaded app config.
    /// API keys are read from environment variables named `VIZCUE_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> VizCueResult<Self> {
        let mut session = Self::new(config.llm.active_provider.clone());
        for (id, entry) in &config.llm.providers {
            session.entries.insert(id.clone(), entry.clone());
            let model = build_model(id, entry, &entry.model)?;
            session.register(model);
        }
        tracing::info!(
            providers = session.models.len(),
            active = %session.active,
            "model session ready"
        );
        Ok(session)
    }

    pub fn active(&self) -> VizCueResult<Arc<dyn VisionModel>> {
        self.models.get(&self.active).cloned().ok_or_else(|| {
            VizCueError::Config(format!("Active provider '{}' not found", self.active))
        })
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active_family(&self) -> ModelFamily {
        self.active()
            .map(|m| m.family())
            .unwrap_or_default()
    }

    pub fn set_active(&mut self, name: &str) -> VizCueResult<()> {
        if self.models.contains_key(name) {
            tracing::info!(from = %self.active, to = %name, "active provider switched");
            self.active = name.to_string();
            Ok(())
        } else {
            Err(VizCueError::Config(format!("Provider '{name}' not registered")))
        }
    }

    /// Point the active provider at a different model id. The family is
    /// re-derived from the new id unless the provider pins one.
    pub fn set_model(&mut self, model: &str) -> VizCueResult<()> {
        let entry = self.entries.get(&self.active).ok_or_else(|| {
            VizCueError::Config(format!("Provider '{}' has no config entry", self.active))
        })?;
        let rebuilt = build_model(&self.active, entry, model)?;
        tracing::info!(provider = %self.active, model = %model, family = ?rebuilt.family(), "active model switched");
        self.models.insert(self.active.clone(), rebuilt);
        Ok(())
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }
}

fn build_model(id: &str, entry: &ProviderEntry, model: &str) -> VizCueResult<Arc<dyn VisionModel>> {
    let api_key = std::env::var(format!("VIZCUE_{}_API_KEY", id.to_uppercase()))
        .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
    let family = entry.family_for(model);
    let call = CallConfig {
        model: model.to_string(),
        temperature: entry.temperature,
        timeout_secs: entry.timeout_secs,
    };
    let vision = OpenAiCompatibleVision::new(
        id.to_string(),
        entry.api_base.clone(),
        api_key,
        call,
        family,
    )?;
    Ok(Arc::new(vision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config() -> AppConfig {
        parse_config(
            r#"
            [llm]
            active_provider = "cog"

            [llm.providers.cog]
            display_name = "CogAgent"
            api_base = "http://localhost:8000/v1/chat/completions"
            model = "cogagent-chat"

            [llm.providers.gemini]
            display_name = "Gemini"
            api_base = "http://localhost:8001/v1/chat/completions"
            model = "gemini-1.5-pro"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn active_model_comes_from_config() {
        let session = ModelSession::from_config(&config()).unwrap();
        assert_eq!(session.active_name(), "cog");
        assert_eq!(session.active_family(), ModelFamily::CogAgent);
        assert_eq!(session.list_names(), ["cog", "gemini"]);
    }

    #[test]
    fn switching_provider_changes_family() {
        let mut session = ModelSession::from_config(&config()).unwrap();
        session.set_active("gemini").unwrap();
        assert_eq!(session.active_family(), ModelFamily::Gemini);
        assert!(session.set_active("missing").is_err());
        assert_eq!(session.active_name(), "gemini");
    }

    #[test]
    fn switching_model_rederives_family() {
        let mut session = ModelSession::from_config(&config()).unwrap();
        session.set_model("llava-13b").unwrap();
        assert_eq!(session.active().unwrap().model(), "llava-13b");
        assert_eq!(session.active_family(), ModelFamily::Llava);
    }

    #[test]
    fn pinned_family_survives_model_switch() {
        let mut config = config();
        config.llm.providers.get_mut("cog").unwrap().family = Some(ModelFamily::CogAgent);
        let mut session = ModelSession::from_config(&config).unwrap();
        session.set_model("llava-13b").unwrap();
        assert_eq!(session.active_family(), ModelFamily::CogAgent);
    }

    #[test]
    fn empty_session_reports_missing_provider() {
        let session = ModelSession::new("nothing".into());
        assert!(matches!(session.active(), Err(VizCueError::Config(_))));
        assert_eq!(session.active_family(), ModelFamily::Generic);
    }
}
