use std::fs;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::datastore::DataStore;
use crate::resource::Resource;
use crate::state::AppState;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches the resource list unless a previous load already succeeded this
/// process. A failed attempt leaves the collection retryable.
#[instrument(skip(state))]
pub fn ensure_loaded(state: &mut AppState, source: &str) -> anyhow::Result<()> {
    if !state.resources.needs_load() {
        debug!("resources already loaded");
        return Ok(());
    }
    load(state, source)
}

/// Unconditional (re)load. Fetch errors land in the collection's `Failed`
/// state rather than propagating; only the stale-token guard decides whether
/// the result applies.
#[instrument(skip(state))]
pub fn load(state: &mut AppState, source: &str) -> anyhow::Result<()> {
    let token = state.resources.begin_load();
    let result = fetch(source).map_err(|err| format!("{err:#}"));
    state.resources.complete_load(token, result);
    Ok(())
}

fn fetch(source: &str) -> anyhow::Result<Vec<Resource>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        let response = client
            .get(source)
            .send()
            .with_context(|| format!("failed to fetch {source}"))?
            .error_for_status()
            .with_context(|| format!("resource source returned an error: {source}"))?;
        response
            .json()
            .context("resource payload was not a valid resource list")
    } else {
        let raw = fs::read_to_string(source)
            .with_context(|| format!("failed to read {source}"))?;
        serde_json::from_str(&raw).context("resource file was not a valid resource list")
    }
}

/// Adds or removes one resource id from favorites. Returns whether the id is
/// a favorite afterwards. Ids are never checked against the loaded resource
/// set; favorites for since-removed resources persist silently.
#[instrument(skip(state, store))]
pub fn toggle_favorite(
    state: &mut AppState,
    store: &DataStore,
    resource_id: u64,
) -> anyhow::Result<bool> {
    if let Some(pos) = state.favorites.iter().position(|id| *id == resource_id) {
        state.favorites.remove(pos);
    } else {
        state.favorites.push(resource_id);
    }
    store.save_favorites(&state.favorites)?;

    let favorite = state.is_favorite(resource_id);
    info!(resource_id, favorite, "favorite toggled");
    Ok(favorite)
}

/// Transient view inputs; unlike the task selection these are never stored.
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    pub search: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub link: String,
    pub favorite: bool,
}

/// Search, category and favorites-only filters composed by AND. Search is a
/// case-insensitive substring match on title or description.
pub fn rows(state: &AppState, query: &ResourceQuery) -> Vec<ResourceRow> {
    let needle = query.search.trim().to_lowercase();

    state
        .resources
        .items()
        .iter()
        .filter(|resource| {
            needle.is_empty()
                || resource.title.to_lowercase().contains(&needle)
                || resource.description.to_lowercase().contains(&needle)
        })
        .filter(|resource| {
            query
                .category
                .as_deref()
                .map(|category| resource.category == category)
                .unwrap_or(true)
        })
        .filter(|resource| !state.selection.favorites_only || state.is_favorite(resource.id))
        .map(|resource| ResourceRow {
            id: resource.id,
            title: resource.title.clone(),
            description: resource.description.clone(),
            category: resource.category.clone(),
            link: resource.link.clone(),
            favorite: state.is_favorite(resource.id),
        })
        .collect()
}
