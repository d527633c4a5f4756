//! Entry normalization.
//!
//! Projects a raw, locale-keyed entry payload into a flat [`Entry`] usable
//! uniformly across spaces. Returns `None` for payloads without a
//! content-type id — the remote API still lists deleted or inaccessible
//! entries, and those carry no content type.
//!
//! Locale selection prefers the space's configured locale when the entry
//! carries it; otherwise the first locale observed across the entry's
//! fields is used. Without a configured locale the pick can differ between
//! spaces, which is a documented limitation of cross-space normalization.

use serde_json::{Map, Value};

use crate::models::{Entry, EntryStatus, RawEntry};

/// Placeholder title when neither `title` nor `name` resolves.
pub const UNTITLED: &str = "Untitled";

/// Fields never included in the assembled content.
const RESERVED_FIELDS: [&str; 3] = ["title", "slug", "url"];

/// Field names treated as body text even when empty.
const BODY_FIELDS: [&str; 4] = ["content", "description", "body", "text"];

/// Normalize one raw entry, or `None` when it is not a content entry.
pub fn normalize(raw: &RawEntry, preferred_locale: Option<&str>) -> Option<Entry> {
    let content_type = raw.sys.content_type.as_ref()?.sys.id.clone();

    let locale = pick_locale(&raw.fields, preferred_locale);

    let title = locale_str(&raw.fields, "title", &locale)
        .or_else(|| locale_str(&raw.fields, "name", &locale))
        .unwrap_or(UNTITLED)
        .to_string();

    let url = locale_str(&raw.fields, "slug", &locale)
        .or_else(|| locale_str(&raw.fields, "url", &locale))
        .unwrap_or("")
        .to_string();

    let mut parts: Vec<&str> = Vec::new();
    for (key, value) in &raw.fields {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let Some(text) = value.get(&locale).and_then(Value::as_str) else {
            continue;
        };
        if BODY_FIELDS.contains(&key.as_str()) || !text.is_empty() {
            parts.push(text);
        }
    }

    let mut content = parts.join("\n").trim().to_string();
    if content.is_empty() {
        content = locale_str(&raw.fields, "description", &locale)
            .or_else(|| locale_str(&raw.fields, "body", &locale))
            .unwrap_or("")
            .to_string();
    }

    let status = if raw.sys.published_version.is_some() {
        EntryStatus::Published
    } else {
        EntryStatus::Draft
    };

    Some(Entry {
        id: raw.sys.id.clone(),
        content_type,
        title,
        content,
        url,
        last_updated: raw.sys.updated_at,
        status,
        // The aggregator overwrites these with the originating credential.
        space_id: raw
            .sys
            .space
            .as_ref()
            .map(|link| link.sys.id.clone())
            .unwrap_or_default(),
        space_name: String::new(),
        version: raw.sys.version,
        created_at: raw.sys.created_at,
    })
}

/// Pick the locale used to flatten the entry.
fn pick_locale(fields: &Map<String, Value>, preferred_locale: Option<&str>) -> String {
    if let Some(preferred) = preferred_locale {
        let present = fields
            .values()
            .filter_map(Value::as_object)
            .any(|locales| locales.contains_key(preferred));
        if present {
            return preferred.to_string();
        }
    }

    for value in fields.values() {
        if let Some(locales) = value.as_object() {
            if let Some(locale) = locales.keys().next() {
                return locale.clone();
            }
        }
    }

    "en-US".to_string()
}

fn locale_str<'a>(fields: &'a Map<String, Value>, field: &str, locale: &str) -> Option<&'a str> {
    fields.get(field)?.get(locale)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_entry(value: serde_json::Value) -> RawEntry {
        serde_json::from_value(value).unwrap()
    }

    fn sys(published: bool) -> serde_json::Value {
        let mut sys = json!({
            "id": "entry-1",
            "contentType": { "sys": { "id": "article" } },
            "version": 7,
            "createdAt": "2024-03-01T09:00:00Z",
            "updatedAt": "2024-06-15T12:30:00Z"
        });
        if published {
            sys["publishedVersion"] = json!(5);
        }
        sys
    }

    #[test]
    fn test_entry_without_content_type_is_skipped() {
        let raw = raw_entry(json!({
            "sys": {
                "id": "gone",
                "createdAt": "2024-03-01T09:00:00Z",
                "updatedAt": "2024-06-15T12:30:00Z"
            },
            "fields": { "title": { "en-US": "Ghost" } }
        }));
        assert!(normalize(&raw, None).is_none());
    }

    #[test]
    fn test_title_body_slug_resolution() {
        let raw = raw_entry(json!({
            "sys": sys(true),
            "fields": {
                "title": { "en-US": "T" },
                "body": { "en-US": "B" },
                "slug": { "en-US": "s" }
            }
        }));

        let entry = normalize(&raw, None).unwrap();
        assert_eq!(entry.title, "T");
        assert_eq!(entry.content, "B");
        assert_eq!(entry.url, "s");
        assert_eq!(entry.status, EntryStatus::Published);
        // title/slug/url never leak into the content.
        assert!(!entry.content.contains('T'));
        assert!(!entry.content.contains('s'));
    }

    #[test]
    fn test_title_falls_back_to_name_then_untitled() {
        let raw = raw_entry(json!({
            "sys": sys(false),
            "fields": { "name": { "en-US": "A name" } }
        }));
        assert_eq!(normalize(&raw, None).unwrap().title, "A name");

        let raw = raw_entry(json!({
            "sys": sys(false),
            "fields": { "summary": { "en-US": "no title here" } }
        }));
        assert_eq!(normalize(&raw, None).unwrap().title, UNTITLED);
    }

    #[test]
    fn test_content_joins_string_fields_and_skips_empty() {
        let raw = raw_entry(json!({
            "sys": sys(true),
            "fields": {
                "body": { "en-US": "first" },
                "empty": { "en-US": "" },
                "summary": { "en-US": "second" },
                "count": { "en-US": 3 }
            }
        }));

        let entry = normalize(&raw, None).unwrap();
        assert_eq!(entry.content, "first\nsecond");
    }

    #[test]
    fn test_status_draft_without_published_version() {
        let raw = raw_entry(json!({
            "sys": sys(false),
            "fields": { "title": { "en-US": "Draft piece" } }
        }));
        assert_eq!(normalize(&raw, None).unwrap().status, EntryStatus::Draft);
    }

    #[test]
    fn test_preferred_locale_wins_when_present() {
        let raw = raw_entry(json!({
            "sys": sys(true),
            "fields": {
                "title": { "de-DE": "Titel", "en-US": "Title" },
                "body": { "de-DE": "Inhalt", "en-US": "Content" }
            }
        }));

        let entry = normalize(&raw, Some("en-US")).unwrap();
        assert_eq!(entry.title, "Title");
        assert_eq!(entry.content, "Content");
    }

    #[test]
    fn test_missing_preferred_locale_falls_back_to_first_observed() {
        let raw = raw_entry(json!({
            "sys": sys(true),
            "fields": {
                "title": { "de-DE": "Titel" },
                "body": { "de-DE": "Inhalt" }
            }
        }));

        let entry = normalize(&raw, Some("fr-FR")).unwrap();
        assert_eq!(entry.title, "Titel");
        assert_eq!(entry.content, "Inhalt");
    }

    #[test]
    fn test_metadata_carried_through() {
        let raw = raw_entry(json!({
            "sys": sys(true),
            "fields": { "title": { "en-US": "T" } }
        }));

        let entry = normalize(&raw, None).unwrap();
        assert_eq!(entry.id, "entry-1");
        assert_eq!(entry.content_type, "article");
        assert_eq!(entry.version, Some(7));
        assert_eq!(
            entry.created_at.to_rfc3339(),
            "2024-03-01T09:00:00+00:00"
        );
    }
}
