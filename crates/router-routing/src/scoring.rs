use router_config::RoutingWeights;
use router_core::ChatRequest;
use router_health::{CircuitState, ProviderHealthRecord};

use crate::candidate::Candidate;

/// A candidate paired with its health record at scoring time and the
/// weighted score that placed it (spec.md §4.4 step 3).
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub health: ProviderHealthRecord,
    pub score: f64,
}

/// Score and sort candidates descending by `score`; ties broken by model
/// `priority` (higher first) then provider name lexicographic (spec.md
/// §4.4 step 3).
///
/// `candidates` and `health` must be the same length and index-aligned —
/// each `health[i]` is the current breaker record for `candidates[i]`.
#[must_use]
pub fn score_candidates(
    candidates: Vec<Candidate>,
    health: Vec<ProviderHealthRecord>,
    request: &ChatRequest,
    weights: &RoutingWeights,
) -> Vec<ScoredCandidate> {
    let costs: Vec<f64> = candidates.iter().map(|c| expected_cost(c, request)).collect();
    let max_cost = costs.iter().copied().fold(0.0_f64, f64::max);
    let max_cost = if max_cost <= 0.0 { 1.0 } else { max_cost };

    let priorities: Vec<i32> = candidates.iter().map(|c| c.model_cfg.priority).collect();
    let min_priority = priorities.iter().copied().min().unwrap_or(0);
    let max_priority = priorities.iter().copied().max().unwrap_or(0);

    let latencies: Vec<Option<f64>> = health.iter().map(|h| h.avg_latency_ms).collect();
    let max_latency = latencies.iter().filter_map(|l| *l).fold(0.0_f64, f64::max);
    let max_latency = if max_latency <= 0.0 { 1.0 } else { max_latency };

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .zip(health)
        .enumerate()
        .map(|(i, (candidate, record))| {
            let c_cost = 1.0 - costs[i] / max_cost;
            let c_quality = quality_score(candidate.model_cfg.priority, min_priority, max_priority);
            let c_latency = latencies[i].map_or(0.5, |observed| 1.0 - observed / max_latency);
            let c_availability = availability_score(record.state);

            let score = weights.cost.mul_add(
                c_cost,
                weights
                    .quality
                    .mul_add(c_quality, weights.latency.mul_add(c_latency, weights.availability * c_availability)),
            );

            ScoredCandidate {
                candidate,
                health: record,
                score,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.candidate.model_cfg.priority.cmp(&a.candidate.model_cfg.priority))
            .then_with(|| a.candidate.provider.cmp(&b.candidate.provider))
    });

    scored
}

/// Expected total cost for one candidate: `tokenCost` blended over
/// `estimatedInputTokens` (request-provided or `len(prompt)/4`) and
/// `estimatedOutputTokens` (request-provided or the model's
/// `maxOutputTokens/2`), per spec.md §4.4 step 3's `c_cost` definition.
fn expected_cost(candidate: &Candidate, request: &ChatRequest) -> f64 {
    let input_tokens = request.estimated_input_tokens();
    let output_tokens = request
        .estimated_output_tokens
        .unwrap_or(candidate.model_cfg.max_output_tokens / 2);
    let total = input_tokens + output_tokens;
    candidate.model_cfg.token_cost.blended(input_tokens, output_tokens) * f64::from(total)
}

fn quality_score(priority: i32, min: i32, max: i32) -> f64 {
    if max <= min {
        return 0.5;
    }
    (f64::from(priority) - f64::from(min)) / (f64::from(max) - f64::from(min))
}

fn availability_score(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 1.0,
        CircuitState::HalfOpen => 0.5,
        CircuitState::Open => 0.0,
    }
}
