use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub id: u64,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub category: String,

    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed(String),
}

/// Handed out by [`ResourceCollection::begin_load`]; a completion carrying a
/// token older than the latest `begin_load` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken(u64);

#[derive(Debug, Default)]
pub struct ResourceCollection {
    items: Vec<Resource>,
    state: LoadState,
    generation: u64,
}

impl ResourceCollection {
    pub fn items(&self) -> &[Resource] {
        &self.items
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// True when a fetch should run: never loaded, or the last attempt failed.
    /// A successful load sticks for the rest of the process unless explicitly
    /// refreshed.
    pub fn needs_load(&self) -> bool {
        matches!(self.state, LoadState::NotLoaded | LoadState::Failed(_))
    }

    pub fn begin_load(&mut self) -> LoadToken {
        self.generation += 1;
        self.state = LoadState::Loading;
        debug!(generation = self.generation, "resource load started");
        LoadToken(self.generation)
    }

    /// Applies a fetch result. Returns false (and changes nothing) when the
    /// token is stale, i.e. another load started after this one.
    pub fn complete_load(
        &mut self,
        token: LoadToken,
        result: Result<Vec<Resource>, String>,
    ) -> bool {
        if token.0 != self.generation {
            warn!(
                token = token.0,
                generation = self.generation,
                "dropping stale resource load result"
            );
            return false;
        }

        match result {
            Ok(items) => {
                debug!(count = items.len(), "resource load finished");
                self.items = items;
                self.state = LoadState::Loaded;
            }
            Err(reason) => {
                warn!(reason = %reason, "resource load failed");
                self.state = LoadState::Failed(reason);
            }
        }
        true
    }
}
