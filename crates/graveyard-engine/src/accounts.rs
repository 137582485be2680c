//! Accounts — sign-up, log-in, admin elevation, user removal

use crate::notifier::Notifier;
use crate::validate;
use chrono::Utc;
use graveyard_core::config::{normalize_email, AdminAllowList};
use graveyard_core::{Caller, Error, LedgerEvent, NewUser, Result, Role, User, UserId};
use graveyard_ledger::LedgerStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Confirmation returned by a successful user deletion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserDeletionReceipt {
    pub user_id: UserId,
    pub projects_removed: usize,
}

pub struct Accounts {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    admins: AdminAllowList,
}

impl Accounts {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn Notifier>, admins: AdminAllowList) -> Self {
        Self { store, notifier, admins }
    }

    pub async fn sign_up(&self, payload: NewUser) -> Result<User> {
        let display_name = payload.display_name.trim();
        if display_name.is_empty() {
            return Err(Error::validation("display name is required"));
        }
        validate::email(&payload.email)?;
        let email = normalize_email(&payload.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            warn!("Sign-up rejected: {} already registered", email);
            return Err(Error::conflict(format!("email already registered: {}", email)));
        }

        let role = if self.admins.contains(&email) { Role::Admin } else { Role::User };
        let user = User {
            id: UserId::generate(),
            display_name: display_name.to_string(),
            email,
            role,
            revival_count: 0,
            created_at: Utc::now(),
        };
        self.store.insert_user(user.clone()).await?;
        info!("User {} signed up as {:?}", user.id, user.role);
        Ok(user)
    }

    /// Resolve a user by email, promoting them if they are now on the allow-list.
    /// An existing admin is never demoted here.
    pub async fn log_in(&self, email: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| Error::not_found("user", &email))?;

        if !user.role.is_admin() && self.admins.contains(&email) {
            let promoted = self.store.set_user_role(&user.id, Role::Admin).await?;
            info!("User {} promoted to admin at log-in", promoted.id);
            return Ok(promoted);
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", user_id))
    }

    /// Remove a user and the projects they own. Admin only.
    pub async fn delete_user(&self, target: &UserId, caller: &Caller) -> Result<UserDeletionReceipt> {
        if !caller.is_admin() {
            warn!("User {} may not delete user {}", caller.id, target);
            return Err(Error::forbidden("only an admin may delete users"));
        }
        self.get_user(target).await?;

        let deleted = self.store.delete_user(target).await?;
        info!(
            "User {} deleted by {} ({} projects removed)",
            target,
            caller.id,
            deleted.projects.len()
        );
        self.notifier.notify(LedgerEvent::LeaderboardChanged {});
        Ok(UserDeletionReceipt {
            user_id: target.clone(),
            projects_removed: deleted.projects.len(),
        })
    }
}
