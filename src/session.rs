//! Search session — the frontend's search entry point.
//!
//! Owns the state a search surface needs between requests: the debounce
//! timer for free-text edits, a monotonically increasing request id, and
//! the latest applied result page. Concurrent searches are not cancelled;
//! instead every dispatch is tagged with its id and a completed search is
//! applied only while its id is still the latest issued, so a slow earlier
//! request can never clobber a newer result (the stale-response race a
//! plain last-writer-wins rendering would have).
//!
//! Free-text changes go through [`SearchSession::submit_query`], which
//! waits out the quiet period; filter, sort, and page changes go through
//! [`SearchSession::submit`] and dispatch immediately. Page navigation is
//! additionally guarded by an in-flight flag so duplicate triggers while a
//! page change is loading are dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::client::ContentApi;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::debounce::Debouncer;
use crate::models::{SearchRequest, SearchResultPage};
use crate::search::search_spaces;

/// Snapshot of the session after the most recently applied search.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Id of the applied request; 0 before any search completes.
    pub request_id: u64,
    pub page: Option<SearchResultPage>,
    pub error: Option<String>,
}

pub struct SearchSession {
    inner: Arc<SessionInner>,
    debouncer: Debouncer,
}

struct SessionInner {
    client: Arc<dyn ContentApi>,
    credentials: Arc<dyn CredentialStore>,
    user_id: String,
    environment: String,
    issued: AtomicU64,
    navigating: AtomicBool,
    state: Mutex<SessionState>,
}

impl SearchSession {
    pub fn new(
        client: Arc<dyn ContentApi>,
        credentials: Arc<dyn CredentialStore>,
        user_id: impl Into<String>,
        environment: impl Into<String>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                client,
                credentials,
                user_id: user_id.into(),
                environment: environment.into(),
                issued: AtomicU64::new(0),
                navigating: AtomicBool::new(false),
                state: Mutex::new(SessionState::default()),
            }),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Build a session for one user with the configured environment and
    /// debounce period.
    pub fn for_user(
        config: &Config,
        client: Arc<dyn ContentApi>,
        credentials: Arc<dyn CredentialStore>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::new(
            client,
            credentials,
            user_id,
            config.api.environment.clone(),
            Duration::from_millis(config.search.debounce_ms),
        )
    }

    /// Dispatch immediately. Used for filter, sort, and scope changes.
    /// Returns the request id assigned to this dispatch.
    pub fn submit(&self, request: SearchRequest) -> u64 {
        self.inner.clone().dispatch(request, false)
    }

    /// Dispatch after the quiet period. Used for free-text query edits;
    /// edits arriving within the period coalesce into one search.
    pub fn submit_query(&mut self, request: SearchRequest) {
        let inner = self.inner.clone();
        self.debouncer.arm(async move {
            inner.dispatch(request, false);
        });
    }

    /// Dispatch a page change. Returns `false` (dropping the trigger) when
    /// a previous page change is still in flight.
    pub fn change_page(&self, request: SearchRequest) -> bool {
        if self.inner.navigating.swap(true, Ordering::SeqCst) {
            debug!("page change already in flight, dropping trigger");
            return false;
        }
        self.inner.clone().dispatch(request, true);
        true
    }

    /// The latest applied search state.
    pub fn state(&self) -> SessionState {
        self.inner.lock_state().clone()
    }
}

impl SessionInner {
    fn dispatch(self: Arc<Self>, request: SearchRequest, clear_navigating: bool) -> u64 {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self;

        tokio::spawn(async move {
            let outcome = match inner.credentials.list(&inner.user_id).await {
                Ok(credentials) => search_spaces(
                    inner.client.clone(),
                    &credentials,
                    &request,
                    &inner.environment,
                )
                .await
                .map_err(|error| error.to_string()),
                Err(error) => Err(error.to_string()),
            };

            inner.apply(sequence, outcome);

            if clear_navigating {
                inner.navigating.store(false, Ordering::SeqCst);
            }
        });

        sequence
    }

    /// Apply a completed search unless a newer request has been issued.
    fn apply(&self, sequence: u64, outcome: Result<SearchResultPage, String>) {
        if sequence != self.issued.load(Ordering::SeqCst) {
            debug!(sequence, "discarding stale search response");
            return;
        }

        let mut state = self.lock_state();
        state.request_id = sequence;
        match outcome {
            Ok(page) => {
                state.page = Some(page);
                state.error = None;
            }
            Err(message) => {
                state.error = Some(message);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
