use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use log::info;
use panel_store::Repository;
use sha2::{Digest, Sha256};

use crate::error::ReconError;
use crate::model::PanelProvider;
use crate::normalize::{normalize_panel, NormalizedPanel};

/// A provider together with its precomputed comparison forms.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub provider: PanelProvider,
    pub normalized: NormalizedPanel,
}

/// Immutable, validated snapshot of the panel directory.
///
/// Entries are held in ascending `code` order, so every scan over the
/// directory is deterministic.
#[derive(Debug)]
pub struct PanelDirectory {
    entries: Vec<DirectoryEntry>,
    by_code: HashMap<String, usize>,
    /// (normalized name, contact digits) -> entry indexes, ascending code.
    exact_index: HashMap<(String, String), Vec<usize>>,
    fingerprint: String,
}

impl PanelDirectory {
    /// Validate and index a provider list. Any blank or duplicate code aborts
    /// the load.
    pub fn new(providers: Vec<PanelProvider>) -> Result<Self, ReconError> {
        let mut sorted: BTreeMap<String, PanelProvider> = BTreeMap::new();
        for p in providers {
            if p.code.trim().is_empty() {
                return Err(ReconError::InvalidProvider {
                    code: p.code.clone(),
                    reason: format!("blank code (name '{}')", p.name),
                });
            }
            if sorted.contains_key(&p.code) {
                return Err(ReconError::DuplicateCode(p.code));
            }
            sorted.insert(p.code.clone(), p);
        }

        let entries: Vec<DirectoryEntry> = sorted
            .into_values()
            .map(|provider| DirectoryEntry {
                normalized: normalize_panel(&provider),
                provider,
            })
            .collect();

        let mut by_code = HashMap::with_capacity(entries.len());
        let mut exact_index: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            by_code.insert(e.provider.code.clone(), i);
            exact_index
                .entry((e.normalized.name.clone(), e.normalized.contact_digits.clone()))
                .or_default()
                .push(i);
        }

        let fingerprint = fingerprint(&entries);
        info!(
            "panel directory loaded: {} provider(s), fingerprint {}",
            entries.len(),
            &fingerprint[..12]
        );

        Ok(Self {
            entries,
            by_code,
            exact_index,
            fingerprint,
        })
    }

    /// Load every provider held by a repository.
    pub fn load_from_repository(repo: &dyn Repository<PanelProvider>) -> Result<Self, ReconError> {
        Self::new(repo.list()?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&PanelProvider> {
        self.by_code.get(code).map(|&i| &self.entries[i].provider)
    }

    pub fn entry(&self, code: &str) -> Option<&DirectoryEntry> {
        self.by_code.get(code).map(|&i| &self.entries[i])
    }

    /// All entries, ascending code.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }

    pub fn on_panel(&self) -> impl Iterator<Item = &PanelProvider> {
        self.entries
            .iter()
            .map(|e| &e.provider)
            .filter(|p| p.is_on_panel())
    }

    /// Entries whose normalized name and contact digits equal the given
    /// comparison forms, ascending code.
    pub fn exact_matches(&self, name: &str, contact_digits: &str) -> Vec<&DirectoryEntry> {
        self.exact_index
            .get(&(name.to_string(), contact_digits.to_string()))
            .map(|ix| ix.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Hex SHA-256 over the sorted provider records.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn providers(&self) -> Vec<PanelProvider> {
        self.entries.iter().map(|e| e.provider.clone()).collect()
    }
}

fn fingerprint(entries: &[DirectoryEntry]) -> String {
    let mut hasher = Sha256::new();
    for e in entries {
        let p = &e.provider;
        for field in [&p.code, &p.name, &p.address, &p.contact] {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update(p.panel_status.to_string().as_bytes());
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Refreshable directory shared across runs.
///
/// A run calls [`snapshot`](Self::snapshot) once and works against that
/// `Arc` for its whole lifetime; [`replace`](Self::replace) never affects a
/// snapshot already taken.
#[derive(Debug)]
pub struct DirectoryHandle {
    current: RwLock<Arc<PanelDirectory>>,
}

impl DirectoryHandle {
    pub fn new(directory: PanelDirectory) -> Self {
        Self {
            current: RwLock::new(Arc::new(directory)),
        }
    }

    pub fn snapshot(&self) -> Arc<PanelDirectory> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&*guard)
    }

    /// Swap in a new directory; returns the previous snapshot.
    pub fn replace(&self, directory: PanelDirectory) -> Arc<PanelDirectory> {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        std::mem::replace(&mut *guard, Arc::new(directory))
    }
}
