//! Remote content API client.
//!
//! Wraps the Contentful Management API behind the [`ContentApi`] trait:
//! space lookup, environment lookup, content-type listing, and entry
//! queries. The aggregator, search session, HTTP server, and tests all talk
//! to the trait, so the HTTP implementation can be swapped for a fake.
//!
//! # Retry policy
//!
//! A rate-limit signal (HTTP 429 or an error body with
//! `sys.id == "RateLimitExceeded"`) is retried up to `max_attempts` times
//! total with exponential backoff: the delay before attempt `n + 1` is
//! `base × 2^(n−1)`, so with the default 2000 ms base the waits are ~2 s
//! then ~4 s. Any other error propagates immediately. Exhausting the
//! attempts fails with [`ClientError::RetriesExhausted`]. Retrying is
//! invisible to callers except as added latency.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::models::{
    ContentTypeSummary, EntryCollection, SearchRequest, SortKey, SpaceCredential,
};

/// Default environment within a space.
pub const DEFAULT_ENVIRONMENT: &str = "master";

/// A resolved space: the external id confirmed by the remote API, plus the
/// token used to reach it.
#[derive(Debug, Clone)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub access_token: String,
}

/// A resolved environment within a space.
#[derive(Debug, Clone)]
pub struct Environment {
    pub space_id: String,
    pub id: String,
    pub access_token: String,
}

/// An entry query in the remote API's vocabulary.
#[derive(Debug, Clone)]
pub struct EntryQuery {
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub published: Option<bool>,
    pub updated_after: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_before: Option<chrono::DateTime<chrono::Utc>>,
    pub tags: Vec<String>,
    pub limit: u32,
    pub skip: u32,
    pub order: String,
}

impl EntryQuery {
    /// Translate a [`SearchRequest`] into the remote API's query parameters.
    pub fn from_request(request: &SearchRequest) -> Self {
        let query = match request.query.trim() {
            "" => None,
            q => Some(q.to_string()),
        };

        Self {
            query,
            content_type: request.content_type.clone(),
            published: request
                .status
                .map(|status| status == crate::models::EntryStatus::Published),
            updated_after: request.updated_after,
            updated_before: request.updated_before,
            tags: request.tags.clone(),
            limit: request.page_size,
            skip: request.page.saturating_sub(1) * request.page_size,
            order: order_expression(request.sort).to_string(),
        }
    }

    /// Render as URL query parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("skip".to_string(), self.skip.to_string()),
            ("order".to_string(), self.order.clone()),
        ];

        if let Some(ref query) = self.query {
            params.push(("query".to_string(), query.clone()));
        }
        if let Some(ref content_type) = self.content_type {
            params.push(("content_type".to_string(), content_type.clone()));
        }
        if let Some(published) = self.published {
            params.push((
                "sys.publishedVersion[exists]".to_string(),
                published.to_string(),
            ));
        }
        if let Some(after) = self.updated_after {
            params.push(("sys.updatedAt[gte]".to_string(), after.to_rfc3339()));
        }
        if let Some(before) = self.updated_before {
            params.push(("sys.updatedAt[lte]".to_string(), before.to_rfc3339()));
        }
        if !self.tags.is_empty() {
            params.push(("metadata.tags.sys.id[in]".to_string(), self.tags.join(",")));
        }

        params
    }
}

/// Sort expression for an entry query.
fn order_expression(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Updated => "-sys.updatedAt",
        SortKey::Created => "-sys.createdAt",
        SortKey::Title => "fields.title",
    }
}

/// Operations against the remote content API.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Confirm a credential against the remote API and return the space.
    ///
    /// Fails with [`ClientError::NotFound`] when the external space id is
    /// unknown and [`ClientError::Unauthorized`] when the token is rejected,
    /// so the connect flow can tell the user to re-check their credentials.
    async fn resolve_space(&self, credential: &SpaceCredential) -> Result<Space, ClientError>;

    async fn resolve_environment(
        &self,
        space: &Space,
        environment_id: &str,
    ) -> Result<Environment, ClientError>;

    async fn list_content_types(
        &self,
        environment: &Environment,
        limit: u32,
    ) -> Result<Vec<ContentTypeSummary>, ClientError>;

    async fn query_entries(
        &self,
        environment: &Environment,
        query: &EntryQuery,
    ) -> Result<EntryCollection, ClientError>;
}

// ============ HTTP implementation ============

/// HTTP client for the Contentful Management API.
#[derive(Debug, Clone)]
pub struct ContentfulClient {
    http: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    base_backoff: Duration,
}

impl ContentfulClient {
    pub fn new(api: &ApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("documint/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            max_attempts: api.max_attempts,
            base_backoff: Duration::from_millis(api.backoff_base_ms),
        }
    }

    fn environment_url(&self, environment: &Environment) -> String {
        format!(
            "{}/spaces/{}/environments/{}",
            self.base_url, environment.space_id, environment.id
        )
    }

    /// Authenticated GET with rate-limit retry, decoding the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        params: &[(String, String)],
        space_id: &str,
    ) -> Result<T, ClientError> {
        with_rate_limit_retry(self.max_attempts, self.base_backoff, || {
            let http = self.http.clone();
            let url = url.to_string();
            let access_token = access_token.to_string();
            let params = params.to_vec();
            let space_id = space_id.to_string();

            async move {
                let mut request = http.get(&url).bearer_auth(&access_token);
                if !params.is_empty() {
                    request = request.query(&params);
                }

                let response = request.send().await?;
                if response.status().is_success() {
                    Ok(response.json::<T>().await?)
                } else {
                    Err(classify_error(&space_id, response).await)
                }
            }
        })
        .await
    }
}

#[async_trait]
impl ContentApi for ContentfulClient {
    async fn resolve_space(&self, credential: &SpaceCredential) -> Result<Space, ClientError> {
        let url = format!("{}/spaces/{}", self.base_url, credential.space_id);
        debug!(space = %credential.space_id, "resolving space");

        let resource: SpaceResource = self
            .get_json(&url, &credential.access_token, &[], &credential.space_id)
            .await?;

        Ok(Space {
            id: resource.sys.id,
            name: resource.name,
            access_token: credential.access_token.clone(),
        })
    }

    async fn resolve_environment(
        &self,
        space: &Space,
        environment_id: &str,
    ) -> Result<Environment, ClientError> {
        let url = format!(
            "{}/spaces/{}/environments/{}",
            self.base_url, space.id, environment_id
        );
        debug!(space = %space.id, environment = environment_id, "resolving environment");

        let resource: EnvironmentResource =
            self.get_json(&url, &space.access_token, &[], &space.id).await?;

        Ok(Environment {
            space_id: space.id.clone(),
            id: resource.sys.id,
            access_token: space.access_token.clone(),
        })
    }

    async fn list_content_types(
        &self,
        environment: &Environment,
        limit: u32,
    ) -> Result<Vec<ContentTypeSummary>, ClientError> {
        let url = format!("{}/content_types", self.environment_url(environment));
        let params = vec![("limit".to_string(), limit.to_string())];

        let collection: CollectionResource<ContentTypeResource> = self
            .get_json(&url, &environment.access_token, &params, &environment.space_id)
            .await?;

        Ok(collection
            .items
            .into_iter()
            .map(|resource| ContentTypeSummary {
                id: resource.sys.id,
                name: resource.name,
                description: resource.description,
                display_field: resource.display_field,
            })
            .collect())
    }

    async fn query_entries(
        &self,
        environment: &Environment,
        query: &EntryQuery,
    ) -> Result<EntryCollection, ClientError> {
        let url = format!("{}/entries", self.environment_url(environment));
        let params = query.to_params();
        debug!(space = %environment.space_id, ?params, "querying entries");

        self.get_json(&url, &environment.access_token, &params, &environment.space_id)
            .await
    }
}

// ============ Wire types ============

#[derive(Debug, Deserialize)]
struct ResourceSys {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpaceResource {
    sys: ResourceSys,
    name: String,
}

#[derive(Debug, Deserialize)]
struct EnvironmentResource {
    sys: ResourceSys,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypeResource {
    sys: ResourceSys,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    display_field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionResource<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    sys: Option<ErrorSys>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorSys {
    id: String,
}

// ============ Error classification ============

/// Map a non-success response to a [`ClientError`], consuming the body.
async fn classify_error(space_id: &str, response: reqwest::Response) -> ClientError {
    let status = response.status();
    let reset_secs = response
        .headers()
        .get("x-contentful-ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    let body = response.text().await.unwrap_or_default();
    let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
    let sys_id = parsed
        .as_ref()
        .and_then(|error| error.sys.as_ref())
        .map(|sys| sys.id.as_str());

    if status == StatusCode::TOO_MANY_REQUESTS || sys_id == Some("RateLimitExceeded") {
        return ClientError::RateLimited { reset_secs };
    }

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound {
            space_id: space_id.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized {
            space_id: space_id.to_string(),
        },
        _ => ClientError::Api {
            status: status.as_u16(),
            message: parsed
                .and_then(|error| error.message)
                .unwrap_or_else(|| body.chars().take(200).collect()),
        },
    }
}

// ============ Retry ============

/// Run `operation`, retrying on [`ClientError::RateLimited`] with
/// exponential backoff. Any other error propagates immediately.
async fn with_rate_limit_retry<T, F, Fut>(
    max_attempts: u32,
    base_backoff: Duration,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Err(ClientError::RateLimited { reset_secs }) if attempt < max_attempts => {
                let delay = base_backoff * 2u32.pow(attempt - 1);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    ?reset_secs,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(ClientError::RateLimited { .. }) => {
                return Err(ClientError::RetriesExhausted {
                    attempts: max_attempts,
                })
            }
            other => return other,
        }
    }
}
