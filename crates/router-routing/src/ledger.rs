use std::sync::Mutex;
use std::time::Duration;

use router_core::LedgerEntry;
use tokio::sync::mpsc;

/// Append-only accounting sink for successful completions (spec.md §3, §4.4
/// step 4c). `append` must never block the attempt loop — the debit it
/// represents is explicitly best-effort per spec.md §4.4 step 4c, so
/// implementations are expected to be fire-and-forget.
pub trait TokenLedger: Send + Sync {
    fn append(&self, entry: LedgerEntry);
}

/// In-process ledger, useful for tests and for a single-node deployment
/// with no external accounting system.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry appended so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().expect("ledger lock poisoned").clone()
    }
}

impl TokenLedger for InMemoryLedger {
    fn append(&self, entry: LedgerEntry) {
        self.entries.lock().expect("ledger lock poisoned").push(entry);
    }
}

/// Batched, fire-and-forget Redis-backed ledger, grounded on the teacher's
/// `UsageReporter::spawn`/`flush_loop` (`synapse-auth/src/usage.rs`): an
/// unbounded-enough `mpsc` channel feeds a background task that flushes on
/// a fixed interval instead of one round trip per entry.
pub struct RedisLedger {
    tx: mpsc::Sender<LedgerEntry>,
}

impl RedisLedger {
    /// Spawn the background flush task and return a handle for recording
    /// entries.
    #[must_use]
    pub fn spawn(client: redis::Client, key_prefix: impl Into<String>, flush_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(10_000);
        tokio::spawn(flush_loop(client, key_prefix.into(), rx, flush_interval));
        Self { tx }
    }
}

impl TokenLedger for RedisLedger {
    fn append(&self, entry: LedgerEntry) {
        let _ = self.tx.try_send(entry);
    }
}

async fn flush_loop(client: redis::Client, key_prefix: String, mut rx: mpsc::Receiver<LedgerEntry>, interval: Duration) {
    let mut buffer: Vec<LedgerEntry> = Vec::new();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            Some(entry) = rx.recv() => {
                buffer.push(entry);
            }
            _ = ticker.tick() => {
                if buffer.is_empty() {
                    continue;
                }
                let batch = std::mem::take(&mut buffer);
                let count = batch.len();
                if let Err(e) = flush_batch(&client, &key_prefix, &batch).await {
                    tracing::warn!(error = %e, count, "failed to flush ledger batch");
                }
            }
        }
    }
}

async fn flush_batch(client: &redis::Client, key_prefix: &str, batch: &[LedgerEntry]) -> redis::RedisResult<()> {
    use redis::AsyncCommands;

    let mut conn = client.get_multiplexed_async_connection().await?;
    for entry in batch {
        let key = format!("{key_prefix}:{}:{}", entry.family_id.as_str(), entry.timestamp);
        let payload = serde_json::to_string(entry).unwrap_or_default();
        let _: () = conn.set(key, payload).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LedgerEntry {
        LedgerEntry {
            request_id: "req-1".to_owned(),
            family_id: router_core::FamilyId::new("us-east-1", "fam-1"),
            provider: "openai".to_owned(),
            model: "gpt".to_owned(),
            prompt_tokens: 10,
            completion_tokens: 20,
            cost: 0.01,
            timestamp: 1_000,
            success: true,
        }
    }

    #[test]
    fn in_memory_ledger_retains_entries_in_order() {
        let ledger = InMemoryLedger::new();
        ledger.append(entry());
        ledger.append(entry());
        assert_eq!(ledger.entries().len(), 2);
    }
}
