//! Core data models used throughout Documint.
//!
//! These types represent the connected-space credentials, raw and normalized
//! entries, and search requests/results that flow through the aggregation
//! pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One Contentful space a user has connected via an access credential.
///
/// Exclusively scoped to the owning user; never shared across tenants.
/// Immutable after creation except for rename and the preferred-locale
/// setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceCredential {
    /// Internal credential id (UUID).
    pub id: String,
    /// Human-readable display name, defaults to the remote space name.
    pub name: String,
    /// The external space id at the content API.
    pub space_id: String,
    /// Management access token for the space.
    pub access_token: String,
    /// Owning user id. Every repository operation re-checks this.
    pub user_id: String,
    /// Preferred locale for normalization, resolved once per space.
    /// When unset, normalization falls back to the first locale observed.
    #[serde(default)]
    pub default_locale: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Credential summary safe to return to frontends (token redacted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub id: String,
    pub name: String,
    pub space_id: String,
    pub default_locale: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&SpaceCredential> for SpaceSummary {
    fn from(credential: &SpaceCredential) -> Self {
        Self {
            id: credential.id.clone(),
            name: credential.name.clone(),
            space_id: credential.space_id.clone(),
            default_locale: credential.default_locale.clone(),
            created_at: credential.created_at,
        }
    }
}

/// A link in Contentful `sys` metadata, e.g. to a content type or space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSys {
    pub id: String,
}

/// System metadata carried by every raw entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySys {
    pub id: String,
    /// Absent for deleted or inaccessible entries the API still lists;
    /// such entries are skipped during normalization.
    #[serde(default)]
    pub content_type: Option<Link>,
    #[serde(default)]
    pub space: Option<Link>,
    #[serde(default)]
    pub version: Option<i64>,
    /// Non-null iff the entry has a published version.
    #[serde(default)]
    pub published_version: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw entry payload as returned by the content API: system metadata plus
/// a locale-keyed field map. Never persisted; consumed immediately by the
/// normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// One page of raw entries from a single space, with the space's total
/// match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryCollection {
    pub total: u64,
    pub items: Vec<RawEntry>,
}

/// Publication status of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Published,
    Draft,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Published => write!(f, "published"),
            EntryStatus::Draft => write!(f, "draft"),
        }
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(EntryStatus::Published),
            "draft" => Ok(EntryStatus::Draft),
            other => Err(format!(
                "unknown status: {}. Use published or draft.",
                other
            )),
        }
    }
}

/// A flat, locale-resolved entry usable uniformly across spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub last_updated: DateTime<Utc>,
    pub status: EntryStatus,
    /// Credential id of the originating space, stamped by the aggregator.
    pub space_id: String,
    /// Display name of the originating space, stamped by the aggregator.
    pub space_name: String,
    pub version: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Sort order for entry queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most recently updated first.
    #[default]
    Updated,
    /// Most recently created first.
    Created,
    /// Title, ascending.
    Title,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "updated" => Ok(SortKey::Updated),
            "created" => Ok(SortKey::Created),
            "title" => Ok(SortKey::Title),
            other => Err(format!(
                "unknown sort key: {}. Use updated, created, or title.",
                other
            )),
        }
    }
}

/// Whether a search targets one connected space or all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    #[default]
    AllSpaces,
    /// A single space, addressed by credential id or external space id.
    Space(String),
}

/// A search request as issued by a frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub status: Option<EntryStatus>,
    #[serde(default)]
    pub updated_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort: SortKey,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub scope: SearchScope,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    25
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            content_type: None,
            status: None,
            updated_after: None,
            updated_before: None,
            tags: Vec::new(),
            sort: SortKey::default(),
            page: default_page(),
            page_size: default_page_size(),
            scope: SearchScope::default(),
        }
    }
}

/// One merged result page across all queried spaces.
///
/// Invariants: `total_pages == ceil(total_items / page_size)` and
/// `items.len() <= page_size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub items: Vec<Entry>,
    pub total_items: u64,
    pub total_pages: u32,
    pub current_page: u32,
}

impl SearchResultPage {
    /// An empty page for a request that matched no connected spaces.
    pub fn empty(current_page: u32) -> Self {
        Self {
            items: Vec::new(),
            total_items: 0,
            total_pages: 0,
            current_page,
        }
    }
}

/// A content type available in a space, as shown in the filter dropdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTypeSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub display_field: Option<String>,
}
