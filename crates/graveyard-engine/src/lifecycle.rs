//! Lifecycle engine — project creation, revival credit, updates, deletion
//!
//! State machine:
//!
//! ```text
//! abandoned ──first revival──▶ revived
//! abandoned | on-hold | revived ──delete──▶ (gone)
//! ```
//!
//! `on-hold` exists as a value only; nothing here moves a project into or out
//! of it. A revived project never goes back to abandoned.

use crate::notifier::Notifier;
use crate::validate;
use chrono::Utc;
use graveyard_core::config::ProjectsConfig;
use graveyard_core::{
    Caller, Error, LedgerEvent, NewProject, Project, ProjectFilter, ProjectId, ProjectPatch,
    ProjectStatus, Result, RevivalEvent, RevivalId, UserId,
};
use graveyard_ledger::{LedgerStore, StoreError, REVIVAL_PAIR};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Confirmation returned by a successful project deletion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeletionReceipt {
    pub project_id: ProjectId,
    pub revivals_removed: usize,
    pub notes_removed: usize,
}

pub struct LifecycleEngine {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    limits: ProjectsConfig,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
        limits: ProjectsConfig,
    ) -> Self {
        Self { store, notifier, limits }
    }

    /// Publish a new project card in `abandoned`.
    pub async fn create_project(&self, owner_id: &UserId, payload: NewProject) -> Result<Project> {
        let title = validate::required_text(
            "title",
            payload.title.as_deref(),
            self.limits.max_title_chars,
        )?;
        let description = validate::required_text(
            "description",
            payload.description.as_deref(),
            self.limits.max_description_chars,
        )?;
        let category = payload
            .category
            .ok_or_else(|| Error::validation("category is required"))?;
        let started_on = payload
            .started_on
            .ok_or_else(|| Error::validation("start date is required"))?;
        validate::date_order(started_on, payload.abandoned_on)?;
        let link = validate::link("link", payload.link.as_deref())?;

        let now = Utc::now();
        let project = Project {
            id: ProjectId::generate(),
            owner_id: owner_id.clone(),
            title,
            description,
            category,
            status: ProjectStatus::Abandoned,
            started_on,
            abandoned_on: payload.abandoned_on,
            link,
            pitch_asset: payload.pitch_asset.filter(|a| !a.trim().is_empty()),
            revived_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_project(project.clone()).await?;
        info!("Project {} created by {} ({})", project.id, owner_id, project.category);
        Ok(project)
    }

    /// Credit `reviver_id` with reviving a project.
    ///
    /// Repeating a successful revival is a no-op that returns the current
    /// project, so retried requests cannot double-credit.
    pub async fn revive_project(
        &self,
        project_id: &ProjectId,
        reviver_id: &UserId,
        notes: &str,
        new_link: Option<&str>,
    ) -> Result<Project> {
        let project = self.require_project(project_id).await?;
        if project.is_owned_by(reviver_id) {
            warn!("User {} tried to revive their own project {}", reviver_id, project_id);
            return Err(Error::forbidden("a project cannot be revived by its owner"));
        }
        let new_link = validate::link("new link", new_link)?;
        if self.store.get_user(reviver_id).await?.is_none() {
            return Err(Error::not_found("user", reviver_id));
        }

        if project.is_revived_by(reviver_id) {
            debug!("Project {} already revived by {} — no-op", project_id, reviver_id);
            return Ok(project);
        }

        let event = RevivalEvent {
            id: RevivalId::generate(),
            project_id: project_id.clone(),
            reviver_id: reviver_id.clone(),
            notes: notes.trim().to_string(),
            new_link,
            created_at: Utc::now(),
        };

        match self.store.record_revival(event).await {
            Ok(updated) => {
                info!(
                    "Project {} revived by {} ({} revivers)",
                    project_id,
                    reviver_id,
                    updated.revived_by.len()
                );
                self.notifier.notify(LedgerEvent::ProjectRevived {
                    project_id: project_id.clone(),
                    reviver_id: reviver_id.clone(),
                    owner_id: updated.owner_id.clone(),
                });
                self.notifier.notify(LedgerEvent::LeaderboardChanged {});
                Ok(updated)
            }
            // A concurrent identical request won the insert.
            Err(StoreError::UniqueViolation { constraint }) if constraint == REVIVAL_PAIR => {
                debug!("Concurrent revival of {} by {} — returning current state", project_id, reviver_id);
                self.require_project(project_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a project with its revivals and notes. Owner or admin only.
    ///
    /// Revival counters are not decremented: they count history, not live state.
    pub async fn delete_project(
        &self,
        project_id: &ProjectId,
        caller: &Caller,
    ) -> Result<DeletionReceipt> {
        let project = self.require_project(project_id).await?;
        if !project.is_owned_by(&caller.id) && !caller.is_admin() {
            warn!("User {} may not delete project {}", caller.id, project_id);
            return Err(Error::forbidden("only the owner or an admin may delete a project"));
        }

        let deleted = self.store.delete_project(project_id).await?;
        info!(
            "Project {} deleted by {} ({} revivals, {} notes removed)",
            project_id, caller.id, deleted.revivals_removed, deleted.notes_removed
        );
        Ok(DeletionReceipt {
            project_id: project_id.clone(),
            revivals_removed: deleted.revivals_removed,
            notes_removed: deleted.notes_removed,
        })
    }

    /// Change descriptive fields. Owner only; status is not part of a patch.
    /// `link`, `abandoned_on` and `pitch_asset` can be cleared with `Some(None)`.
    pub async fn update_project(
        &self,
        project_id: &ProjectId,
        caller: &Caller,
        patch: ProjectPatch,
    ) -> Result<Project> {
        let project = self.require_project(project_id).await?;
        if !project.is_owned_by(&caller.id) {
            warn!("User {} may not edit project {}", caller.id, project_id);
            return Err(Error::forbidden("only the owner may edit a project"));
        }
        if patch.is_empty() {
            return Ok(project);
        }

        let mut patch = patch;
        if patch.title.is_some() {
            patch.title = Some(validate::required_text(
                "title",
                patch.title.as_deref(),
                self.limits.max_title_chars,
            )?);
        }
        if patch.description.is_some() {
            patch.description = Some(validate::required_text(
                "description",
                patch.description.as_deref(),
                self.limits.max_description_chars,
            )?);
        }
        if let Some(link) = patch.link.take() {
            patch.link = Some(validate::link("link", link.as_deref())?);
        }
        validate::date_order(
            patch.started_on.unwrap_or(project.started_on),
            patch.abandoned_on.unwrap_or(project.abandoned_on),
        )?;

        let updated = self.store.patch_project(project_id, &patch).await?;
        debug!("Project {} updated by owner", project_id);
        Ok(updated)
    }

    pub async fn get_project(&self, project_id: &ProjectId) -> Result<Project> {
        self.require_project(project_id).await
    }

    pub async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        Ok(self.store.list_projects(filter).await?)
    }

    /// Revival history of a project, oldest first.
    pub async fn list_revivals(&self, project_id: &ProjectId) -> Result<Vec<RevivalEvent>> {
        self.require_project(project_id).await?;
        Ok(self.store.revivals_for_project(project_id).await?)
    }

    async fn require_project(&self, project_id: &ProjectId) -> Result<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found("project", project_id))
    }
}
