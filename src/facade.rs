use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    backend::IndexBackend,
    error::{Error, Result},
    partition::{Hit, LanguageFilter},
};

/// Tunables for the search facade.
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    /// Hard cap on the size of a merged result set.
    pub max_results: usize,
    /// Per-partition query deadline. Partitions that miss it are
    /// reported as degraded rather than blocking the caller.
    pub timeout: Duration,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            max_results: 50,
            timeout: Duration::from_millis(2000),
        }
    }
}

/// One search call: a query plus optional scoping filters.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Free-text query in tantivy query syntax.
    pub query: String,
    /// Partitions to search; empty means all configured partitions.
    pub scope: Vec<String>,
    /// Language restriction; unrestricted by default.
    pub languages: LanguageFilter,
    /// Caller-requested result cap, bounded by `max_results`.
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// A merged, score-ordered result set.
///
/// `degraded` lists partitions whose hits are missing because they
/// failed or timed out; callers can tell "zero hits" from "search
/// partially failed" from a hard [`Error::BackendUnreachable`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub hits: Vec<Hit>,
    pub total: usize,
    pub degraded: Vec<String>,
}

impl SearchResults {
    fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total: 0,
            degraded: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Validates inputs, fans a query out across index partitions, and
/// merges per-partition hit lists into one bounded, ordered result set.
pub struct SearchFacade<B: IndexBackend + 'static> {
    backend: Arc<B>,
    config: FacadeConfig,
}

impl<B: IndexBackend + 'static> SearchFacade<B> {
    pub fn new(backend: Arc<B>, config: FacadeConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Execute one search call.
    ///
    /// Unknown partitions in the scope are skipped silently. A failing
    /// or timed-out partition contributes zero hits and is listed in
    /// `degraded`; only a malformed query or the loss of every queried
    /// partition surfaces as `Err`.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        if request.query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let scope = resolve_scope(&request.scope, &self.backend.partitions());
        if scope.is_empty() {
            return Ok(SearchResults::empty());
        }

        let limit = request
            .limit
            .map_or(self.config.max_results, |n| {
                n.min(self.config.max_results)
            });

        let slots = self.fan_out(&scope, request, limit);

        let mut hits = Vec::new();
        let mut degraded = Vec::new();
        for (name, outcome) in scope.iter().zip(slots) {
            match outcome {
                Some(Ok(partition_hits)) => hits.extend(partition_hits),
                Some(Err(Error::QuerySyntax(msg))) => {
                    return Err(Error::QuerySyntax(msg));
                }
                Some(Err(err)) => {
                    tracing::warn!(partition = %name, error = %err, "partition query failed");
                    degraded.push(name.clone());
                }
                None => {
                    tracing::warn!(
                        partition = %name,
                        timeout_ms = self.config.timeout.as_millis() as u64,
                        "partition query timed out"
                    );
                    degraded.push(name.clone());
                }
            }
        }

        if degraded.len() == scope.len() {
            return Err(Error::BackendUnreachable { failed: degraded });
        }

        // Stable sort keeps scope order for equal scores.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        let total = hits.len();

        Ok(SearchResults {
            hits,
            total,
            degraded,
        })
    }

    /// Query each partition on its own thread, collecting outcomes
    /// until the deadline. Slots left `None` timed out; their threads
    /// are abandoned and finish on their own.
    fn fan_out(
        &self,
        scope: &[String],
        request: &SearchRequest,
        limit: usize,
    ) -> Vec<Option<Result<Vec<Hit>>>> {
        let (tx, rx) = crossbeam_channel::unbounded();

        for (slot, name) in scope.iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            let tx = tx.clone();
            let name = name.clone();
            let query = request.query.clone();
            let languages = request.languages.clone();
            std::thread::spawn(move || {
                let outcome = backend.query(&name, &query, &languages, limit);
                // The receiver may have given up on us after the deadline.
                let _ = tx.send((slot, outcome));
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.config.timeout;
        let mut slots: Vec<Option<Result<Vec<Hit>>>> =
            (0..scope.len()).map(|_| None).collect();
        let mut received = 0;
        while received < scope.len() {
            match rx.recv_deadline(deadline) {
                Ok((slot, outcome)) => {
                    slots[slot] = Some(outcome);
                    received += 1;
                }
                Err(_) => break,
            }
        }
        slots
    }
}

/// Resolve the effective scope: empty means every configured partition;
/// otherwise an order-preserving dedup with unknown names dropped.
fn resolve_scope(requested: &[String], configured: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return configured.to_vec();
    }
    let known: HashSet<&str> = configured.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|name| {
            known.contains(name.as_str()) && seen.insert(name.as_str())
        })
        .cloned()
        .collect()
}
