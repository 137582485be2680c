//! Stats aggregator — per-user counts, badges, leaderboard
//!
//! Everything here is derived on read from the shared store. Nothing is cached.

use graveyard_core::config::LeaderboardConfig;
use graveyard_core::{ProjectFilter, ProjectStatus, Result, User, UserId};
use graveyard_ledger::LedgerStore;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// Achievement labels, computed from counts and never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Badge {
    Gravedigger,
    Necromancer,
    Undertaker,
    Resurrector,
    CemeteryKeeper,
    Lazarus,
}

/// Which count a badge threshold is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Basis {
    Posted,
    Revived,
}

impl Badge {
    /// Display order of the badge shelf.
    pub const ALL: [Badge; 6] = [
        Badge::Gravedigger,
        Badge::Necromancer,
        Badge::Undertaker,
        Badge::Resurrector,
        Badge::CemeteryKeeper,
        Badge::Lazarus,
    ];

    fn requirement(self) -> (Basis, u64) {
        match self {
            Badge::Gravedigger => (Basis::Posted, 5),
            Badge::Necromancer => (Basis::Revived, 3),
            Badge::Undertaker => (Basis::Posted, 10),
            Badge::Resurrector => (Basis::Revived, 5),
            Badge::CemeteryKeeper => (Basis::Posted, 25),
            Badge::Lazarus => (Basis::Revived, 10),
        }
    }

    /// Badges earned for the given counts, in display order.
    pub fn earned(posted: u64, revived: u64) -> Vec<Badge> {
        Self::ALL
            .into_iter()
            .filter(|badge| match badge.requirement() {
                (Basis::Posted, min) => posted >= min,
                (Basis::Revived, min) => revived >= min,
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    /// Projects the user owns.
    pub posted_count: u64,
    /// Owned projects someone else has revived.
    pub revived_by_others_count: u64,
    /// Revival events the user authored, including those on since-deleted projects.
    pub revived_count: u64,
    pub badges: Vec<Badge>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    pub user_id: UserId,
    pub display_name: String,
    pub revival_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GlobalStats {
    pub users: usize,
    pub projects: usize,
    pub abandoned: usize,
    pub on_hold: usize,
    pub revived: usize,
    pub revivals: usize,
    pub notes: usize,
}

/// A user whose stored revival counter disagrees with their revival events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CounterDrift {
    pub user_id: UserId,
    pub stored: u64,
    pub derived: u64,
}

pub struct StatsAggregator {
    store: Arc<dyn LedgerStore>,
    leaderboard: LeaderboardConfig,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn LedgerStore>, leaderboard: LeaderboardConfig) -> Self {
        Self { store, leaderboard }
    }

    /// Counts and badges for one user. An unknown user gets all zeros.
    pub async fn user_stats(&self, user_id: &UserId) -> Result<UserStats> {
        let owned = self
            .store
            .list_projects(&ProjectFilter::owned_by(user_id.clone()))
            .await?;
        let posted_count = owned.len() as u64;
        let revived_by_others_count = owned.iter().filter(|p| !p.revived_by.is_empty()).count() as u64;
        let revived_count = self.revivals_credited(user_id).await?;

        Ok(UserStats {
            posted_count,
            revived_by_others_count,
            revived_count,
            badges: Badge::earned(posted_count, revived_count),
        })
    }

    /// Top revivers. `limit` is clamped to the configured maximum.
    pub async fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardEntry>> {
        let limit = self.leaderboard.resolve(limit);
        let mut users = self.store.list_users().await?;
        users.sort_by(leaderboard_order);

        let entries: Vec<_> = users
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                rank: i + 1,
                user_id: user.id,
                display_name: user.display_name,
                revival_count: user.revival_count,
            })
            .collect();
        debug!("Leaderboard: {} entries (limit {})", entries.len(), limit);
        Ok(entries)
    }

    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let users = self.store.list_users().await?.len();
        let projects = self.store.list_projects(&ProjectFilter::default()).await?;
        let by_status =
            |status: ProjectStatus| projects.iter().filter(|p| p.status == status).count();

        Ok(GlobalStats {
            users,
            projects: projects.len(),
            abandoned: by_status(ProjectStatus::Abandoned),
            on_hold: by_status(ProjectStatus::OnHold),
            revived: by_status(ProjectStatus::Revived),
            revivals: self.store.count_revivals().await?,
            notes: self.store.count_notes().await?,
        })
    }

    /// Users whose `revival_count` no longer matches their revival events
    /// (live plus retired).
    pub async fn audit_counters(&self) -> Result<Vec<CounterDrift>> {
        let mut drift = Vec::new();
        for user in self.store.list_users().await? {
            let derived = self.revivals_credited(&user.id).await?;
            if derived != user.revival_count {
                warn!(
                    "Revival counter drift for {}: stored {}, derived {}",
                    user.id, user.revival_count, derived
                );
                drift.push(CounterDrift {
                    user_id: user.id,
                    stored: user.revival_count,
                    derived,
                });
            }
        }
        Ok(drift)
    }

    /// Live revival events plus those retired with a deleted project.
    async fn revivals_credited(&self, user_id: &UserId) -> Result<u64> {
        let live = self.store.revivals_by_user(user_id).await?.len() as u64;
        Ok(live + self.store.retired_revivals(user_id).await?)
    }
}

/// Count descending, then oldest account, then id. Total over distinct users.
fn leaderboard_order(a: &User, b: &User) -> Ordering {
    b.revival_count
        .cmp(&a.revival_count)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
