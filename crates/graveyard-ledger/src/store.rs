//! Ledger store contract
//!
//! Every engine talks to the ledger through this trait. Implementations must
//! provide three guarantees the engines rely on:
//!
//! - uniqueness of (project_id, reviver_id) across revival events, and of user email
//! - `record_revival` applies all of its effects in one atomic step
//! - cascade deletes scoped to a project id or an owner id; revivals removed
//!   by a cascade stay credited to their reviver via `retired_revivals`

use graveyard_core::{
    Error, Note, NoteId, Project, ProjectFilter, ProjectId, ProjectPatch, RevivalEvent, Role,
    User, UserId,
};
use thiserror::Error;

/// Constraint name reported when a (project, reviver) pair is recorded twice.
pub const REVIVAL_PAIR: &str = "revival(project_id, reviver_id)";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: &'static str },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt ledger: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => Error::NotFound { entity, id },
            StoreError::UniqueViolation { constraint } => {
                Error::conflict(format!("unique constraint violated: {}", constraint))
            }
            StoreError::Unavailable(msg) => Error::StoreUnavailable(msg),
            StoreError::Corrupt(msg) => Error::validation(format!("corrupt ledger: {}", msg)),
        }
    }
}

/// What a project cascade removed.
#[derive(Clone, Debug, PartialEq)]
pub struct DeletedProject {
    pub project: Project,
    pub revivals_removed: usize,
    pub notes_removed: usize,
}

/// What a user cascade removed.
#[derive(Clone, Debug, PartialEq)]
pub struct DeletedUser {
    pub user: User,
    pub projects: Vec<DeletedProject>,
}

#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    // --- users ---

    /// Insert a new user. Fails with `UniqueViolation` on a duplicate id or email.
    async fn insert_user(&self, user: User) -> StoreResult<()>;

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<User>>;

    /// Look up by normalized email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn set_user_role(&self, id: &UserId, role: Role) -> StoreResult<User>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Remove a user and every project they own, with those projects' revivals and notes.
    async fn delete_user(&self, id: &UserId) -> StoreResult<DeletedUser>;

    // --- projects ---

    async fn insert_project(&self, project: Project) -> StoreResult<()>;

    async fn get_project(&self, id: &ProjectId) -> StoreResult<Option<Project>>;

    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>>;

    /// Apply descriptive fields in place; status and revivers are never touched.
    async fn patch_project(&self, id: &ProjectId, patch: &ProjectPatch) -> StoreResult<Project>;

    /// Remove a project with its revivals and notes.
    async fn delete_project(&self, id: &ProjectId) -> StoreResult<DeletedProject>;

    // --- revivals ---

    /// Atomically: insert the event, append the reviver to `revived_by`, mark the
    /// project revived and increment the reviver's counter. A second event for the
    /// same (project, reviver) pair fails with `UniqueViolation` and changes nothing.
    async fn record_revival(&self, event: RevivalEvent) -> StoreResult<Project>;

    async fn revivals_for_project(&self, id: &ProjectId) -> StoreResult<Vec<RevivalEvent>>;

    async fn revivals_by_user(&self, id: &UserId) -> StoreResult<Vec<RevivalEvent>>;

    /// Revivals `id` authored on projects that have since been deleted. The
    /// events are gone with their project; the credit is not.
    async fn retired_revivals(&self, id: &UserId) -> StoreResult<u64>;

    async fn count_revivals(&self) -> StoreResult<usize>;

    // --- notes ---

    async fn insert_note(&self, note: Note) -> StoreResult<()>;

    async fn get_note(&self, id: &NoteId) -> StoreResult<Option<Note>>;

    async fn notes_for_project(&self, id: &ProjectId) -> StoreResult<Vec<Note>>;

    async fn delete_note(&self, id: &NoteId) -> StoreResult<Note>;

    async fn count_notes(&self) -> StoreResult<usize>;
}
