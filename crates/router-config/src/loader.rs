use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded =
            crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the routing weights don't sum to 1.0, a rollout
    /// percentage exceeds 100, or a model references an unknown provider.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_routing()?;
        self.validate_providers()?;
        Ok(())
    }

    fn validate_routing(&self) -> anyhow::Result<()> {
        if !self.snapshot.routing.weights.is_normalized() {
            anyhow::bail!("routing.weights must sum to 1.0");
        }

        if let Some(ref provider) = self.snapshot.routing.default_provider
            && !self.snapshot.providers.contains_key(provider)
        {
            anyhow::bail!("routing.default_provider '{provider}' is not a configured provider");
        }

        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        if self.snapshot.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured");
        }

        for (name, provider) in &self.snapshot.providers {
            if provider.rollout_percentage > 100 {
                anyhow::bail!("provider '{name}' rollout_percentage must be <= 100");
            }
            if !provider.models.contains_key(&provider.default_model) {
                anyhow::bail!("provider '{name}' default_model '{}' is not in its models table", provider.default_model);
            }
            for (model_name, model) in &provider.models {
                if model.rollout_percentage > 100 {
                    anyhow::bail!("model '{name}/{model_name}' rollout_percentage must be <= 100");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    const MINIMAL: &str = r#"
[server]

[snapshot.providers.openai]
secret_id = "openai-key"
default_model = "gpt-4o-mini"

[snapshot.providers.openai.models.gpt-4o-mini]
token_cost = 0.000002
"#;

    fn write_temp_config(contents: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("router-config-test-{n}-{}.toml", std::process::id()));
        std::fs::write(&path, contents).expect("write temp config");
        path
    }

    #[test]
    fn loads_minimal_config() {
        let path = write_temp_config(MINIMAL);
        let config = Config::load(&path).expect("load minimal config");
        assert!(config.snapshot.providers.contains_key("openai"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_unnormalized_weights() {
        let contents = format!(
            "{MINIMAL}\n[snapshot.routing.weights]\ncost = 0.9\nquality = 0.9\nlatency = 0.0\navailability = 0.0\n"
        );
        let path = write_temp_config(&contents);
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("weights"));
        std::fs::remove_file(path).ok();
    }
}
