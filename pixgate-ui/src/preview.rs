//! Preview handle registry
//!
//! Every candidate file gets a preview handle so its image can be rendered
//! before upload. Handles live in a process-wide table and must be released
//! explicitly when the file leaves the batch; the registry counts creations
//! and releases so a leak or a double release is observable.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};
use uuid::Uuid;

/// Scheme prefix of preview URLs
pub const PREVIEW_URL_PREFIX: &str = "blob:pixgate/";

/// Reference to a registered preview
///
/// Deliberately not `Clone`: the candidate file owning it is the only holder.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: Uuid,
    url: String,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// URL under which the preview resolves while live
    pub fn url(&self) -> &str {
        &self.url
    }
}

struct PreviewEntry {
    name: String,
    bytes: Bytes,
}

#[derive(Default)]
struct RegistryState {
    live: HashMap<Uuid, PreviewEntry>,
    created: u64,
    released: u64,
}

/// Shared table of live previews
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // Entries stay consistent even if a holder panicked mid-update
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `bytes` and hand out a fresh handle
    pub fn create(&self, name: &str, bytes: Bytes) -> PreviewHandle {
        let id = Uuid::new_v4();
        let url = format!("{}{}", PREVIEW_URL_PREFIX, id);

        let mut state = self.state();
        state.live.insert(
            id,
            PreviewEntry {
                name: name.to_string(),
                bytes,
            },
        );
        state.created += 1;
        trace!(preview = %url, name = %name, "Preview created");

        PreviewHandle { id, url }
    }

    /// Release a handle
    ///
    /// Returns `true` the first time, `false` if it was already released.
    pub fn release(&self, handle: &PreviewHandle) -> bool {
        let mut state = self.state();
        match state.live.remove(&handle.id) {
            Some(entry) => {
                state.released += 1;
                trace!(preview = %handle.url, name = %entry.name, "Preview released");
                true
            }
            None => {
                debug!(preview = %handle.url, "Preview already released");
                false
            }
        }
    }

    /// Image bytes behind a live preview URL
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        let id = url.strip_prefix(PREVIEW_URL_PREFIX)?;
        let id = Uuid::parse_str(id).ok()?;
        self.state().live.get(&id).map(|entry| entry.bytes.clone())
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.state().live.contains_key(&handle.id)
    }

    /// Number of handles created and not yet released
    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn created_count(&self) -> u64 {
        self.state().created
    }

    pub fn released_count(&self) -> u64 {
        self.state().released
    }
}

impl std::fmt::Debug for PreviewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PreviewRegistry")
            .field("live", &state.live.len())
            .field("created", &state.created)
            .field("released", &state.released)
            .finish()
    }
}
