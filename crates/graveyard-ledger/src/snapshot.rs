//! Ledger snapshots — whole-ledger image persisted as JSON
//!
//! A snapshot is written to `<path>.tmp` and renamed over `<path>`, so a
//! crash mid-write leaves the previous snapshot intact.

use crate::store::StoreError;
use graveyard_core::{Note, Project, ProjectId, Result, RevivalEvent, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub revivals: Vec<RevivalEvent>,
    pub notes: Vec<Note>,
    /// Revivals per user whose events went away with a deleted project.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub retired_revivals: BTreeMap<UserId, u64>,
}

impl LedgerSnapshot {
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    /// Build a snapshot with every table sorted by (created_at, id).
    pub fn from_parts(
        mut users: Vec<User>,
        mut projects: Vec<Project>,
        mut revivals: Vec<RevivalEvent>,
        mut notes: Vec<Note>,
    ) -> Self {
        users.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        projects.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        revivals.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        notes.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Self {
            version: SNAPSHOT_VERSION,
            users,
            projects,
            revivals,
            notes,
            retired_revivals: BTreeMap::new(),
        }
    }

    /// Check the invariants a live ledger maintains.
    ///
    /// Counter drift is not checked here; it is reported by the stats audit instead.
    pub fn validate(&self) -> std::result::Result<(), StoreError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!("unsupported snapshot version {}", self.version)));
        }

        let mut user_ids = HashSet::new();
        let mut emails = HashSet::new();
        for user in &self.users {
            if !user_ids.insert(&user.id) {
                return Err(corrupt(format!("duplicate user {}", user.id)));
            }
            if !emails.insert(user.email.as_str()) {
                return Err(corrupt(format!("duplicate email {}", user.email)));
            }
        }

        let mut owners: HashMap<&ProjectId, &UserId> = HashMap::new();
        for project in &self.projects {
            if owners.insert(&project.id, &project.owner_id).is_some() {
                return Err(corrupt(format!("duplicate project {}", project.id)));
            }
            if !user_ids.contains(&project.owner_id) {
                return Err(corrupt(format!(
                    "project {} owned by unknown user {}",
                    project.id, project.owner_id
                )));
            }
        }

        let mut pairs: HashMap<&ProjectId, BTreeSet<&UserId>> = HashMap::new();
        let mut revival_ids = HashSet::new();
        for revival in &self.revivals {
            if !revival_ids.insert(&revival.id) {
                return Err(corrupt(format!("duplicate revival {}", revival.id)));
            }
            let owner = owners.get(&revival.project_id).ok_or_else(|| {
                corrupt(format!(
                    "revival {} references unknown project {}",
                    revival.id, revival.project_id
                ))
            })?;
            if *owner == &revival.reviver_id {
                return Err(corrupt(format!(
                    "owner {} recorded as reviver of {}",
                    revival.reviver_id, revival.project_id
                )));
            }
            if !pairs
                .entry(&revival.project_id)
                .or_default()
                .insert(&revival.reviver_id)
            {
                return Err(corrupt(format!(
                    "duplicate revival of {} by {}",
                    revival.project_id, revival.reviver_id
                )));
            }
        }

        for project in &self.projects {
            let listed: BTreeSet<&UserId> = project.revived_by.iter().collect();
            if listed.len() != project.revived_by.len() {
                return Err(corrupt(format!("project {} lists a reviver twice", project.id)));
            }
            let recorded = pairs.remove(&project.id).unwrap_or_default();
            if listed != recorded {
                return Err(corrupt(format!(
                    "project {} revivers disagree with its revival events",
                    project.id
                )));
            }
        }

        let mut note_ids = HashSet::new();
        for note in &self.notes {
            if !note_ids.insert(&note.id) {
                return Err(corrupt(format!("duplicate note {}", note.id)));
            }
            if !owners.contains_key(&note.project_id) {
                return Err(corrupt(format!(
                    "note {} references unknown project {}",
                    note.id, note.project_id
                )));
            }
        }

        for user_id in self.retired_revivals.keys() {
            if !user_ids.contains(user_id) {
                return Err(corrupt(format!(
                    "retired revivals recorded for unknown user {}",
                    user_id
                )));
            }
        }

        Ok(())
    }
}

fn corrupt(message: String) -> StoreError {
    StoreError::Corrupt(message)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a snapshot atomically.
pub fn save(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
    fs::rename(&tmp, path)?;
    tracing::debug!("Wrote ledger snapshot to {}", path.display());
    Ok(())
}

/// Read a snapshot. A missing file yields an empty ledger.
pub fn load(path: &Path) -> Result<LedgerSnapshot> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No ledger snapshot at {} — starting empty", path.display());
            Ok(LedgerSnapshot::empty())
        }
        Err(e) => Err(e.into()),
    }
}
