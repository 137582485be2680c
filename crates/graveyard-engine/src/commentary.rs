//! Commentary gate — notes attached to projects
//!
//! Authors are always stored. Whether a reader sees one is decided here, when a
//! `Note` is projected into a `NoteView`.

use crate::notifier::Notifier;
use crate::validate;
use chrono::{DateTime, Utc};
use graveyard_core::config::NotesConfig;
use graveyard_core::{
    Caller, Error, LedgerEvent, Note, NoteAuthor, NoteId, Project, ProjectId, Result, UserId,
};
use graveyard_ledger::LedgerStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reader-facing projection of a note. Never carries an anonymous author's id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NoteView {
    pub id: NoteId,
    pub project_id: ProjectId,
    pub author: NoteAuthor,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            project_id: note.project_id.clone(),
            author: NoteAuthor::of(note),
            body: note.body.clone(),
            created_at: note.created_at,
        }
    }
}

pub struct CommentaryGate {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    limits: NotesConfig,
}

impl CommentaryGate {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn Notifier>, limits: NotesConfig) -> Self {
        Self { store, notifier, limits }
    }

    /// Attach a note to a project. Anyone may post.
    pub async fn post_note(
        &self,
        project_id: &ProjectId,
        author_id: &UserId,
        body: &str,
        is_anonymous: bool,
    ) -> Result<NoteView> {
        let body = validate::required_text("note body", Some(body), self.limits.max_body_chars)?;
        self.require_project(project_id).await?;

        let note = Note {
            id: NoteId::generate(),
            project_id: project_id.clone(),
            author_id: author_id.clone(),
            body,
            is_anonymous,
            created_at: Utc::now(),
        };
        self.store.insert_note(note.clone()).await?;

        let view = NoteView::from(&note);
        info!(
            "Note {} added to project {}{}",
            note.id,
            project_id,
            if is_anonymous { " (anonymous)" } else { "" }
        );
        self.notifier.notify(LedgerEvent::NoteAdded {
            project_id: project_id.clone(),
            note_id: note.id,
            visible_author: view.author.clone(),
        });
        Ok(view)
    }

    /// Notes on a project, oldest first.
    ///
    /// Only the owner or an admin may read them. Whether non-owners should see
    /// commentary is unresolved; this keeps the restrictive rule until decided.
    pub async fn list_notes(&self, project_id: &ProjectId, caller: &Caller) -> Result<Vec<NoteView>> {
        let project = self.require_project(project_id).await?;
        if !project.is_owned_by(&caller.id) && !caller.is_admin() {
            warn!("User {} may not read notes on project {}", caller.id, project_id);
            return Err(Error::forbidden("only the owner or an admin may read notes"));
        }

        let notes = self.store.notes_for_project(project_id).await?;
        debug!("Listing {} notes on project {}", notes.len(), project_id);
        Ok(notes.iter().map(NoteView::from).collect())
    }

    /// Remove a note. Admins and the project owner always may; an author may
    /// only remove a note they signed.
    pub async fn delete_note(&self, note_id: &NoteId, caller: &Caller) -> Result<()> {
        let note = self
            .store
            .get_note(note_id)
            .await?
            .ok_or_else(|| Error::not_found("note", note_id))?;
        let owns_project = self
            .store
            .get_project(&note.project_id)
            .await?
            .is_some_and(|p| p.is_owned_by(&caller.id));
        let signed_by_caller = !note.is_anonymous && note.author_id == caller.id;

        if !(caller.is_admin() || owns_project || signed_by_caller) {
            warn!("User {} may not delete note {}", caller.id, note_id);
            return Err(Error::forbidden("not allowed to delete this note"));
        }

        self.store.delete_note(note_id).await?;
        info!("Note {} deleted by {}", note_id, caller.id);
        Ok(())
    }

    async fn require_project(&self, project_id: &ProjectId) -> Result<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found("project", project_id))
    }
}
