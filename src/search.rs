//! Cross-space search aggregation.
//!
//! Fans one entry query per connected space out concurrently, normalizes
//! each space's raw entries, merges the survivors, and recomputes totals
//! across spaces.
//!
//! # Fan-out semantics
//!
//! 1. Resolve the scope to a set of credentials (one space or all of them).
//! 2. Spawn one resolve-space → resolve-environment → query-entries chain
//!    per credential; every space is asked for the same `limit`/`skip`
//!    window. Per-space windows are an approximation of a global page when
//!    spaces differ in size; this matches the dashboard's behaviour and is
//!    kept as-is.
//! 3. Merge normalized entries in completion order of the underlying calls.
//!    There is no cross-space ordering guarantee beyond each space's own
//!    sort; callers must not rely on space order in the merged output.
//! 4. A failing space contributes an empty result and a warning log line
//!    instead of aborting the batch. Only when every space fails does the
//!    search fail, with [`SearchError::AllSourcesFailed`].

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::client::{ContentApi, EntryQuery};
use crate::error::{ClientError, SearchError};
use crate::models::{
    EntryCollection, SearchRequest, SearchResultPage, SearchScope, SpaceCredential,
};
use crate::normalize::normalize;

/// Run one search across the given credentials.
///
/// `environment` names the environment queried within each space
/// (normally `master`).
pub async fn search_spaces(
    client: Arc<dyn ContentApi>,
    credentials: &[SpaceCredential],
    request: &SearchRequest,
    environment: &str,
) -> Result<SearchResultPage, SearchError> {
    let selected = resolve_scope(credentials, &request.scope)?;
    if selected.is_empty() {
        debug!("no connected spaces in scope, returning empty page");
        return Ok(SearchResultPage::empty(request.page));
    }

    let page_size = request.page_size.max(1);
    let query = EntryQuery::from_request(request);

    let mut tasks: JoinSet<(SpaceCredential, Result<EntryCollection, ClientError>)> =
        JoinSet::new();
    for credential in selected {
        let client = client.clone();
        let query = query.clone();
        let environment = environment.to_string();
        tasks.spawn(async move {
            let result = query_one_space(client.as_ref(), &credential, &query, &environment).await;
            (credential, result)
        });
    }

    let attempted = tasks.len();
    let mut failures = 0usize;
    let mut items = Vec::new();
    let mut total_items = 0u64;

    while let Some(joined) = tasks.join_next().await {
        let Ok((credential, result)) = joined else {
            failures += 1;
            continue;
        };

        match result {
            Ok(collection) => {
                total_items += collection.total;
                for raw in &collection.items {
                    if let Some(mut entry) = normalize(raw, credential.default_locale.as_deref()) {
                        entry.space_id = credential.id.clone();
                        entry.space_name = credential.name.clone();
                        items.push(entry);
                    }
                }
            }
            Err(error) => {
                failures += 1;
                warn!(space = %credential.name, %error, "space query failed, continuing without it");
            }
        }
    }

    if failures == attempted {
        return Err(SearchError::AllSourcesFailed { attempted });
    }

    // Keep the page invariant: concatenating per-space windows can exceed
    // the requested size when several spaces respond.
    items.truncate(page_size as usize);

    Ok(SearchResultPage {
        items,
        total_items,
        total_pages: total_pages(total_items, page_size),
        current_page: request.page,
    })
}

/// Restrict the credential set to the requested scope.
fn resolve_scope(
    credentials: &[SpaceCredential],
    scope: &SearchScope,
) -> Result<Vec<SpaceCredential>, SearchError> {
    match scope {
        SearchScope::AllSpaces => Ok(credentials.to_vec()),
        SearchScope::Space(wanted) => credentials
            .iter()
            .find(|c| &c.id == wanted || &c.space_id == wanted)
            .map(|c| vec![c.clone()])
            .ok_or_else(|| SearchError::UnknownSpace(wanted.clone())),
    }
}

async fn query_one_space(
    client: &dyn ContentApi,
    credential: &SpaceCredential,
    query: &EntryQuery,
    environment: &str,
) -> Result<EntryCollection, ClientError> {
    let space = client.resolve_space(credential).await?;
    let environment = client.resolve_environment(&space, environment).await?;
    client.query_entries(&environment, query).await
}

fn total_pages(total_items: u64, page_size: u32) -> u32 {
    total_items.div_ceil(page_size as u64) as u32
}
