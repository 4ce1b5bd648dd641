mod candidate;
mod ledger;
mod router;
mod scoring;

pub use candidate::{enumerate_candidates, Candidate};
pub use ledger::{InMemoryLedger, RedisLedger, TokenLedger};
pub use router::{ModelRouter, SnapshotSource};
pub use scoring::{score_candidates, ScoredCandidate};
