use serde::Serialize;

use crate::{
    backend::IndexBackend,
    error::Result,
    guard::{AccessPolicy, authorize_rebuild},
};

/// Outcome of a rebuild request.
///
/// The count reflects pages *scheduled* for indexing, not pages
/// completed; indexing finishes asynchronously on the backend's workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildStatus {
    Scheduled(usize),
    Denied,
}

impl RebuildStatus {
    /// Wire-level sentinel form: the scheduled count, or -1 when denied.
    pub fn as_count(&self) -> i64 {
        match self {
            Self::Scheduled(n) => *n as i64,
            Self::Denied => -1,
        }
    }
}

/// Trigger a full reindex of every configured partition.
///
/// The access policy is consulted first; a denied caller gets
/// [`RebuildStatus::Denied`] back without any backend call being made.
pub fn rebuild_index<B: IndexBackend>(
    policy: &dyn AccessPolicy,
    caller_token: &str,
    backend: &B,
) -> Result<RebuildStatus> {
    if !authorize_rebuild(policy, caller_token) {
        return Ok(RebuildStatus::Denied);
    }

    let mut scheduled = 0;
    for partition in backend.partitions() {
        let count = backend.schedule_reindex(&partition)?;
        tracing::info!(%partition, count, "scheduled partition reindex");
        scheduled += count;
    }
    Ok(RebuildStatus::Scheduled(scheduled))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        error::Error,
        guard::TokenGuard,
        partition::{Hit, LanguageFilter},
    };

    /// Backend that records every call made against it.
    struct CountingBackend {
        names: Vec<String>,
        pages_per_partition: usize,
        calls: Mutex<Vec<String>>,
    }

    impl CountingBackend {
        fn new(names: &[&str], pages_per_partition: usize) -> Self {
            Self {
                names: names.iter().map(|s| s.to_string()).collect(),
                pages_per_partition,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl IndexBackend for CountingBackend {
        fn partitions(&self) -> Vec<String> {
            self.calls.lock().unwrap().push("partitions".to_string());
            self.names.clone()
        }

        fn query(
            &self,
            _partition: &str,
            _query: &str,
            _languages: &LanguageFilter,
            _limit: usize,
        ) -> crate::error::Result<Vec<Hit>> {
            unreachable!("rebuild must not query")
        }

        fn schedule_reindex(
            &self,
            partition: &str,
        ) -> crate::error::Result<usize> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("schedule:{partition}"));
            Ok(self.pages_per_partition)
        }
    }

    #[test]
    fn admin_caller_gets_scheduled_count() {
        let backend = CountingBackend::new(&["wiki-en", "wiki-fr"], 5000);
        let guard = TokenGuard::new(["admin-token".to_string()]);

        let status = rebuild_index(&guard, "admin-token", &backend).unwrap();
        assert_eq!(status, RebuildStatus::Scheduled(10000));
        assert_eq!(status.as_count(), 10000);
        assert_eq!(
            backend.calls(),
            vec!["partitions", "schedule:wiki-en", "schedule:wiki-fr"]
        );
    }

    #[test]
    fn denied_caller_makes_zero_backend_calls() {
        let backend = CountingBackend::new(&["wiki-en"], 5000);
        let guard = TokenGuard::new(["admin-token".to_string()]);

        let status = rebuild_index(&guard, "not-admin", &backend).unwrap();
        assert_eq!(status, RebuildStatus::Denied);
        assert_eq!(status.as_count(), -1);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn unauthenticated_caller_is_denied() {
        let backend = CountingBackend::new(&["wiki-en"], 1);
        let guard = TokenGuard::default();

        let status = rebuild_index(&guard, "", &backend).unwrap();
        assert_eq!(status, RebuildStatus::Denied);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn backend_failure_propagates() {
        struct FailingBackend;
        impl IndexBackend for FailingBackend {
            fn partitions(&self) -> Vec<String> {
                vec!["wiki".to_string()]
            }
            fn query(
                &self,
                _: &str,
                _: &str,
                _: &LanguageFilter,
                _: usize,
            ) -> crate::error::Result<Vec<Hit>> {
                unreachable!()
            }
            fn schedule_reindex(
                &self,
                _: &str,
            ) -> crate::error::Result<usize> {
                Err(Error::Config("index writer unavailable".into()))
            }
        }

        let guard = TokenGuard::new(["t".to_string()]);
        let err = rebuild_index(&guard, "t", &FailingBackend).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
