use indexmap::IndexMap;

/// Provider name of the offline models; they only answer to themselves.
pub const DRYRUN_PROVIDER: &str = "dryrun";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub output_token_limit: Option<u32>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }

    /// Spec for a provider model the registry has no entry for. It is trusted
    /// with the capability it was requested for.
    pub fn unlisted(name: &str, provider: &str, capability: &str) -> Self {
        Self {
            name: name.trim().trim_start_matches("models/").to_string(),
            provider: provider.to_string(),
            capabilities: vec![capability.to_string()],
            output_token_limit: None,
        }
    }

    pub fn exceeds_output_limit(&self, max_output_tokens: u32) -> bool {
        self.output_token_limit
            .is_some_and(|limit| max_output_tokens > limit)
    }
}

/// Known models in preference order; the first model with a capability is
/// that capability's default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim().trim_start_matches("models/"))
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        self.get(name)
            .filter(|model| model.supports(capability))
            .cloned()
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, provider: &str, capabilities: &[&str], limit: Option<u32>| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
                output_token_limit: limit,
            },
        );
    };

    insert("gemini-2.0-flash", "gemini", &["text"], Some(8192));
    insert("gemini-2.5-flash", "gemini", &["text"], Some(65536));
    insert("gemini-2.5-pro", "gemini", &["text"], Some(65536));
    insert("gemini-1.5-flash", "gemini", &["text"], Some(8192));
    insert(
        "gemini-2.0-flash-preview-image-generation",
        "gemini",
        &["text", "image"],
        Some(8192),
    );
    insert("gemini-2.5-flash-image", "gemini", &["text", "image"], Some(32768));
    insert(
        "gemini-3-pro-image-preview",
        "gemini",
        &["text", "image"],
        Some(32768),
    );
    insert("dryrun-text-1", DRYRUN_PROVIDER, &["text"], None);
    insert("dryrun-image-1", DRYRUN_PROVIDER, &["text", "image"], None);

    map
}

#[cfg(test)]
mod tests {
    use super::{ModelRegistry, ModelSpec};

    #[test]
    fn lookup_accepts_models_prefix() {
        let registry = ModelRegistry::default();
        let spec = registry.get(" models/gemini-2.5-pro ").unwrap();
        assert_eq!(spec.output_token_limit, Some(65536));
        assert!(registry.ensure("gemini-2.5-pro", "image").is_none());
    }

    #[test]
    fn output_limit_only_applies_when_known() {
        let registry = ModelRegistry::default();
        let flash = registry.get("gemini-2.0-flash").unwrap();
        assert!(!flash.exceeds_output_limit(8192));
        assert!(flash.exceeds_output_limit(8193));
        assert!(!registry
            .get("dryrun-text-1")
            .unwrap()
            .exceeds_output_limit(u32::MAX));
    }

    #[test]
    fn unlisted_spec_carries_requested_capability() {
        let spec = ModelSpec::unlisted("models/gemini-2.5-flash-lite", "gemini", "text");
        assert_eq!(spec.name, "gemini-2.5-flash-lite");
        assert!(spec.supports("text"));
        assert!(!spec.supports("image"));
        assert_eq!(spec.output_token_limit, None);
    }
}
