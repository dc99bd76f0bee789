use super::registry::{ModelRegistry, ModelSpec, DRYRUN_PROVIDER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        let fallback_reason = match requested {
            Some(name) => {
                if let Some(model) = self.registry.ensure(name, capability) {
                    return Ok(ModelSelection {
                        model,
                        requested: Some(name.to_string()),
                        fallback_reason: None,
                    });
                }
                format!("Requested model '{name}' unavailable for capability '{capability}'.")
            }
            None => "No model specified; using default.".to_string(),
        };

        let Some(model) = self.registry.by_capability(capability).into_iter().next() else {
            return Err(format!(
                "No models available for capability '{capability}'."
            ));
        };
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }

    /// Like [`ModelSelector::select`] but restricted to one provider, so an
    /// offline session never falls back onto a remote model and vice versa.
    ///
    /// A name the registry has never heard of is passed through to remote
    /// providers unchanged; only known names are checked for the capability.
    pub fn select_for_provider(
        &self,
        requested: Option<&str>,
        capability: &str,
        provider: &str,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        if let Some(name) = requested {
            if provider != DRYRUN_PROVIDER && self.registry.get(name).is_none() {
                return Ok(ModelSelection {
                    model: ModelSpec::unlisted(name, provider, capability),
                    requested: Some(name.to_string()),
                    fallback_reason: None,
                });
            }
        }

        let scoped = ModelSelector::new(Some(ModelRegistry::new(Some(
            self.registry
                .list()
                .filter(|model| model.provider == provider)
                .map(|model| (model.name.clone(), model.clone()))
                .collect(),
        ))));
        scoped.select(requested, capability)
    }
}
