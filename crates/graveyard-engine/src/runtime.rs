//! Graveyard runtime — wires the engines to one shared store and notifier

use crate::accounts::Accounts;
use crate::commentary::CommentaryGate;
use crate::lifecycle::LifecycleEngine;
use crate::notifier::Notifier;
use crate::stats::StatsAggregator;
use graveyard_core::GraveyardConfig;
use graveyard_ledger::LedgerStore;
use std::sync::Arc;

pub struct Graveyard {
    store: Arc<dyn LedgerStore>,
    lifecycle: LifecycleEngine,
    stats: StatsAggregator,
    commentary: CommentaryGate,
    accounts: Accounts,
}

impl Graveyard {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn Notifier>, config: &GraveyardConfig) -> Self {
        Self {
            lifecycle: LifecycleEngine::new(store.clone(), notifier.clone(), config.projects.clone()),
            stats: StatsAggregator::new(store.clone(), config.leaderboard.clone()),
            commentary: CommentaryGate::new(store.clone(), notifier.clone(), config.notes.clone()),
            accounts: Accounts::new(store.clone(), notifier, config.admin_allow_list()),
            store,
        }
    }

    pub fn lifecycle(&self) -> &LifecycleEngine {
        &self.lifecycle
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn commentary(&self) -> &CommentaryGate {
        &self.commentary
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }
}
