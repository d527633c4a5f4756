use anyhow::Result;
use std::sync::Arc;

use crate::client::{ContentApi, ContentfulClient};
use crate::config::Config;
use crate::credentials::{CredentialStore, NewCredential, SqliteCredentialStore};
use crate::db;
use crate::error::ClientError;
use crate::models::{SearchRequest, SpaceCredential};
use crate::pagination::{page_window, PageItem};
use crate::search::search_spaces;

async fn open_store(config: &Config) -> Result<SqliteCredentialStore> {
    Ok(SqliteCredentialStore::new(db::connect(config).await?))
}

/// List the user's connected spaces.
pub async fn run_spaces(config: &Config, user: &str) -> Result<()> {
    let store = open_store(config).await?;
    let credentials = store.list(user).await?;

    if credentials.is_empty() {
        println!("No connected spaces. Use `dmt connect` to add one.");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:<14} {:<8} CONNECTED",
        "ID", "NAME", "SPACE", "LOCALE"
    );
    for credential in &credentials {
        println!(
            "{:<38} {:<20} {:<14} {:<8} {}",
            credential.id,
            credential.name,
            credential.space_id,
            credential.default_locale.as_deref().unwrap_or("-"),
            credential.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

/// Verify a credential against the remote API and connect the space.
pub async fn run_connect(
    config: &Config,
    user: &str,
    space_id: &str,
    access_token: &str,
    name: Option<String>,
    locale: Option<String>,
) -> Result<()> {
    let client = ContentfulClient::new(&config.api);

    let candidate = SpaceCredential {
        id: String::new(),
        name: String::new(),
        space_id: space_id.to_string(),
        access_token: access_token.to_string(),
        user_id: user.to_string(),
        default_locale: locale.clone(),
        created_at: chrono::Utc::now(),
    };

    let space = match client.resolve_space(&candidate).await {
        Ok(space) => space,
        Err(ClientError::Unauthorized { .. }) => {
            eprintln!("Error: the access token was rejected. Please check your credentials.");
            std::process::exit(1);
        }
        Err(ClientError::NotFound { .. }) => {
            eprintln!("Error: no space with id '{}'. Please check the space id.", space_id);
            std::process::exit(1);
        }
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    };

    let store = open_store(config).await?;
    let credential = store
        .add(
            user,
            NewCredential {
                name: name.unwrap_or(space.name),
                space_id: space_id.to_string(),
                access_token: access_token.to_string(),
                default_locale: locale,
            },
        )
        .await?;

    println!("Connected '{}' ({}) as {}", credential.name, credential.space_id, credential.id);
    Ok(())
}

/// Rename a connected space.
pub async fn run_rename(config: &Config, user: &str, id: &str, name: &str) -> Result<()> {
    let store = open_store(config).await?;
    let credential = store.rename(user, id, name).await?;
    println!("Renamed {} to '{}'", credential.id, credential.name);
    Ok(())
}

/// Disconnect a space.
pub async fn run_disconnect(config: &Config, user: &str, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    store.remove(user, id).await?;
    println!("Disconnected {}", id);
    Ok(())
}

/// List the content types of one connected space, sorted by name.
pub async fn run_types(config: &Config, user: &str, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let credentials = store.list(user).await?;
    let Some(credential) = credentials.iter().find(|c| c.id == id || c.space_id == id) else {
        eprintln!("Error: no connected space with id {}", id);
        std::process::exit(1);
    };

    let client = ContentfulClient::new(&config.api);
    let space = client.resolve_space(credential).await?;
    let environment = client
        .resolve_environment(&space, &config.api.environment)
        .await?;
    let mut content_types = client
        .list_content_types(&environment, config.search.content_type_limit)
        .await?;
    content_types.sort_by(|a, b| a.name.cmp(&b.name));

    for content_type in &content_types {
        match &content_type.description {
            Some(description) => println!("{:<24} {} — {}", content_type.id, content_type.name, description),
            None => println!("{:<24} {}", content_type.id, content_type.name),
        }
    }

    Ok(())
}

/// Run one cross-space search and print the result page.
pub async fn run_search(config: &Config, user: &str, request: &SearchRequest) -> Result<()> {
    let store = open_store(config).await?;
    let credentials = store.list(user).await?;

    let client: Arc<dyn ContentApi> = Arc::new(ContentfulClient::new(&config.api));
    let page = match search_spaces(client, &credentials, request, &config.api.environment).await {
        Ok(page) => page,
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    };

    if page.items.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "{} result(s), page {} of {}",
        page.total_items, page.current_page, page.total_pages
    );
    println!();

    for (i, entry) in page.items.iter().enumerate() {
        println!(
            "{}. [{}] {} / {}",
            i + 1,
            entry.status,
            entry.space_name,
            entry.title
        );
        println!("    type: {}", entry.content_type);
        if !entry.url.is_empty() {
            println!("    url: {}", entry.url);
        }
        println!("    updated: {}", entry.last_updated.format("%Y-%m-%d"));
        if !entry.content.is_empty() {
            println!("    excerpt: \"{}\"", excerpt(&entry.content, 120));
        }
        println!();
    }

    let window: Vec<String> = page_window(page.current_page, page.total_pages)
        .into_iter()
        .map(|item| match item {
            PageItem::Page(page) => page.to_string(),
            PageItem::Ellipsis => "...".to_string(),
        })
        .collect();
    println!("pages: {}", window.join(" "));

    Ok(())
}

/// First `max_chars` characters of the content, newlines flattened.
fn excerpt(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ");
    let trimmed = flat.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
