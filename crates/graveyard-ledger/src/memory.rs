//! In-process ledger store
//!
//! All tables live behind one `RwLock`, so every write method is a single
//! critical section. That is what makes `record_revival` atomic and its
//! (project, reviver) uniqueness check race-free.

use crate::snapshot::LedgerSnapshot;
use crate::store::{
    DeletedProject, DeletedUser, LedgerStore, StoreError, StoreResult, REVIVAL_PAIR,
};
use graveyard_core::config::normalize_email;
use graveyard_core::{
    Note, NoteId, Project, ProjectFilter, ProjectId, ProjectPatch, ProjectStatus, RevivalEvent,
    RevivalId, Role, User, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

const USER_EMAIL: &str = "user(email)";
const USER_ID: &str = "user(id)";
const PROJECT_ID: &str = "project(id)";
const NOTE_ID: &str = "note(id)";

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    projects: HashMap<ProjectId, Project>,
    revivals: HashMap<RevivalId, RevivalEvent>,
    revival_pairs: HashMap<(ProjectId, UserId), RevivalId>,
    notes: HashMap<NoteId, Note>,
    /// Credit that outlived its revival events when their project was deleted.
    retired_revivals: HashMap<UserId, u64>,
}

impl Tables {
    fn remove_project_cascade(&mut self, id: &ProjectId) -> Option<DeletedProject> {
        let project = self.projects.remove(id)?;

        let revivers: Vec<UserId> = self
            .revivals
            .values()
            .filter(|r| &r.project_id == id)
            .map(|r| r.reviver_id.clone())
            .collect();
        self.revivals.retain(|_, r| &r.project_id != id);
        self.revival_pairs.retain(|(p, _), _| p != id);
        for reviver in &revivers {
            *self.retired_revivals.entry(reviver.clone()).or_default() += 1;
        }
        let revivals_removed = revivers.len();

        let before = self.notes.len();
        self.notes.retain(|_, n| &n.project_id != id);
        let notes_removed = before - self.notes.len();

        Some(DeletedProject {
            project,
            revivals_removed,
            notes_removed,
        })
    }
}

pub struct MemoryLedger {
    tables: RwLock<Tables>,
    available: AtomicBool,
}

impl Default for MemoryLedger {
    fn default() -> Self { Self::new() }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Rebuild a ledger from a snapshot, rejecting one that breaks the ledger invariants.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> StoreResult<Self> {
        snapshot.validate()?;

        let mut tables = Tables::default();
        for user in snapshot.users {
            tables.emails.insert(user.email.clone(), user.id.clone());
            tables.users.insert(user.id.clone(), user);
        }
        for project in snapshot.projects {
            tables.projects.insert(project.id.clone(), project);
        }
        for revival in snapshot.revivals {
            tables.revival_pairs.insert(
                (revival.project_id.clone(), revival.reviver_id.clone()),
                revival.id.clone(),
            );
            tables.revivals.insert(revival.id.clone(), revival);
        }
        for note in snapshot.notes {
            tables.notes.insert(note.id.clone(), note);
        }
        tables.retired_revivals = snapshot.retired_revivals.into_iter().collect();

        info!(
            "Ledger restored: {} users, {} projects, {} revivals, {} notes",
            tables.users.len(),
            tables.projects.len(),
            tables.revivals.len(),
            tables.notes.len()
        );

        Ok(Self {
            tables: RwLock::new(tables),
            available: AtomicBool::new(true),
        })
    }

    /// Consistent image of every table, in deterministic order.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        let t = self.tables.read().await;
        let mut snapshot = LedgerSnapshot::from_parts(
            t.users.values().cloned().collect(),
            t.projects.values().cloned().collect(),
            t.revivals.values().cloned().collect(),
            t.notes.values().cloned().collect(),
        );
        snapshot.retired_revivals = t
            .retired_revivals
            .iter()
            .map(|(id, n)| (id.clone(), *n))
            .collect();
        snapshot
    }

    /// Simulate the backing store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("ledger offline".into()))
        }
    }
}

fn oldest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, &str)) {
    items.sort_by(|a, b| key(a).cmp(&key(b)));
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedger {
    async fn insert_user(&self, mut user: User) -> StoreResult<()> {
        self.ensure_available()?;
        user.email = normalize_email(&user.email);
        let mut t = self.tables.write().await;
        if t.users.contains_key(&user.id) {
            return Err(StoreError::UniqueViolation { constraint: USER_ID });
        }
        if t.emails.contains_key(&user.email) {
            return Err(StoreError::UniqueViolation { constraint: USER_EMAIL });
        }
        t.emails.insert(user.email.clone(), user.id.clone());
        t.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        let t = self.tables.read().await;
        Ok(t
            .emails
            .get(&normalize_email(email))
            .and_then(|id| t.users.get(id))
            .cloned())
    }

    async fn set_user_role(&self, id: &UserId, role: Role) -> StoreResult<User> {
        self.ensure_available()?;
        let mut t = self.tables.write().await;
        let user = t
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.ensure_available()?;
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        oldest_first(&mut users, |u| (u.created_at, u.id.as_str()));
        Ok(users)
    }

    async fn delete_user(&self, id: &UserId) -> StoreResult<DeletedUser> {
        self.ensure_available()?;
        let mut t = self.tables.write().await;
        let user = t
            .users
            .remove(id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        t.emails.remove(&user.email);

        let owned: Vec<ProjectId> = t
            .projects
            .values()
            .filter(|p| &p.owner_id == id)
            .map(|p| p.id.clone())
            .collect();
        let projects: Vec<DeletedProject> = owned
            .iter()
            .filter_map(|pid| t.remove_project_cascade(pid))
            .collect();

        t.retired_revivals.remove(id);

        debug!("Deleted user {} with {} owned projects", id, projects.len());
        Ok(DeletedUser { user, projects })
    }

    async fn insert_project(&self, project: Project) -> StoreResult<()> {
        self.ensure_available()?;
        let mut t = self.tables.write().await;
        if t.projects.contains_key(&project.id) {
            return Err(StoreError::UniqueViolation { constraint: PROJECT_ID });
        }
        if !t.users.contains_key(&project.owner_id) {
            return Err(StoreError::not_found("user", &project.owner_id));
        }
        t.projects.insert(project.id.clone(), project);
        Ok(())
    }

    async fn get_project(&self, id: &ProjectId) -> StoreResult<Option<Project>> {
        self.ensure_available()?;
        Ok(self.tables.read().await.projects.get(id).cloned())
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>> {
        self.ensure_available()?;
        let mut projects: Vec<Project> = self
            .tables
            .read()
            .await
            .projects
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        // newest first
        projects.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(projects)
    }

    async fn patch_project(&self, id: &ProjectId, patch: &ProjectPatch) -> StoreResult<Project> {
        self.ensure_available()?;
        let mut t = self.tables.write().await;
        let project = t
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("project", id))?;
        patch.apply_to(project);
        project.updated_at = chrono::Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &ProjectId) -> StoreResult<DeletedProject> {
        self.ensure_available()?;
        self.tables
            .write()
            .await
            .remove_project_cascade(id)
            .ok_or_else(|| StoreError::not_found("project", id))
    }

    async fn record_revival(&self, event: RevivalEvent) -> StoreResult<Project> {
        self.ensure_available()?;
        let mut guard = self.tables.write().await;
        let t = &mut *guard;

        let pair = (event.project_id.clone(), event.reviver_id.clone());
        if t.revival_pairs.contains_key(&pair) {
            return Err(StoreError::UniqueViolation { constraint: REVIVAL_PAIR });
        }
        if t.revivals.contains_key(&event.id) {
            return Err(StoreError::UniqueViolation { constraint: "revival(id)" });
        }
        let reviver = t
            .users
            .get_mut(&event.reviver_id)
            .ok_or_else(|| StoreError::not_found("user", &event.reviver_id))?;
        let project = t
            .projects
            .get_mut(&event.project_id)
            .ok_or_else(|| StoreError::not_found("project", &event.project_id))?;
        if project.owner_id == event.reviver_id {
            return Err(StoreError::Corrupt(format!(
                "owner {} cannot be recorded as reviver of {}",
                event.reviver_id, event.project_id
            )));
        }

        project.revived_by.push(event.reviver_id.clone());
        project.status = ProjectStatus::Revived;
        project.updated_at = event.created_at;
        let updated = project.clone();
        reviver.revival_count += 1;

        t.revival_pairs.insert(pair, event.id.clone());
        t.revivals.insert(event.id.clone(), event);
        Ok(updated)
    }

    async fn revivals_for_project(&self, id: &ProjectId) -> StoreResult<Vec<RevivalEvent>> {
        self.ensure_available()?;
        let mut events: Vec<RevivalEvent> = self
            .tables
            .read()
            .await
            .revivals
            .values()
            .filter(|r| &r.project_id == id)
            .cloned()
            .collect();
        oldest_first(&mut events, |r| (r.created_at, r.id.as_str()));
        Ok(events)
    }

    async fn revivals_by_user(&self, id: &UserId) -> StoreResult<Vec<RevivalEvent>> {
        self.ensure_available()?;
        let mut events: Vec<RevivalEvent> = self
            .tables
            .read()
            .await
            .revivals
            .values()
            .filter(|r| &r.reviver_id == id)
            .cloned()
            .collect();
        oldest_first(&mut events, |r| (r.created_at, r.id.as_str()));
        Ok(events)
    }

    async fn retired_revivals(&self, id: &UserId) -> StoreResult<u64> {
        self.ensure_available()?;
        Ok(self
            .tables
            .read()
            .await
            .retired_revivals
            .get(id)
            .copied()
            .unwrap_or(0))
    }

    async fn count_revivals(&self) -> StoreResult<usize> {
        self.ensure_available()?;
        Ok(self.tables.read().await.revivals.len())
    }

    async fn insert_note(&self, note: Note) -> StoreResult<()> {
        self.ensure_available()?;
        let mut t = self.tables.write().await;
        if t.notes.contains_key(&note.id) {
            return Err(StoreError::UniqueViolation { constraint: NOTE_ID });
        }
        if !t.projects.contains_key(&note.project_id) {
            return Err(StoreError::not_found("project", &note.project_id));
        }
        t.notes.insert(note.id.clone(), note);
        Ok(())
    }

    async fn get_note(&self, id: &NoteId) -> StoreResult<Option<Note>> {
        self.ensure_available()?;
        Ok(self.tables.read().await.notes.get(id).cloned())
    }

    async fn notes_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Note>> {
        self.ensure_available()?;
        let mut notes: Vec<Note> = self
            .tables
            .read()
            .await
            .notes
            .values()
            .filter(|n| &n.project_id == id)
            .cloned()
            .collect();
        oldest_first(&mut notes, |n| (n.created_at, n.id.as_str()));
        Ok(notes)
    }

    async fn delete_note(&self, id: &NoteId) -> StoreResult<Note> {
        self.ensure_available()?;
        self.tables
            .write()
            .await
            .notes
            .remove(id)
            .ok_or_else(|| StoreError::not_found("note", id))
    }

    async fn count_notes(&self) -> StoreResult<usize> {
        self.ensure_available()?;
        Ok(self.tables.read().await.notes.len())
    }
}
