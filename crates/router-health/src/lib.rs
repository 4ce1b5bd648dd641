mod breaker;
mod record;
mod store;

pub use breaker::CircuitBreakerManager;
pub use record::{health_key, CircuitState, ProviderHealthRecord};
pub use store::{HealthStoreError, InMemoryHealthStore, ProviderHealthStore, RedisHealthStore};
