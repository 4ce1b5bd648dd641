use router_providers::{ProviderSecret, SecretError, SecretStore};
use secrecy::SecretString;

/// Reads provider credentials from `{SECRET_ID}_API_KEY`-shaped environment
/// variables.
///
/// Spec.md's Non-goals exclude designing a secret *provisioning* mechanism,
/// not the need for some concrete, working `SecretStore` — this is that
/// minimal concrete store. `RotateKey`'s `previous` half is never populated
/// here since environment variables carry no rotation history; adapters
/// still retry once on `AUTH` per spec.md §4.2, it simply has nothing to
/// fall back to.
pub struct EnvSecretStore;

#[async_trait::async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<ProviderSecret, SecretError> {
        let var_name = format!("{}_API_KEY", secret_id.to_uppercase().replace('-', "_"));
        let current = std::env::var(&var_name).map_err(|_| SecretError::NotFound(secret_id.to_owned()))?;
        Ok(ProviderSecret {
            current: SecretString::from(current),
            previous: None,
        })
    }
}
