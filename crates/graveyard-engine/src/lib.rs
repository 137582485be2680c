//! Graveyard Engine - project lifecycle, revival credit, stats and commentary

pub mod accounts;
pub mod commentary;
pub mod lifecycle;
pub mod notifier;
pub mod runtime;
pub mod stats;
mod validate;

pub use accounts::{Accounts, UserDeletionReceipt};
pub use commentary::{CommentaryGate, NoteView};
pub use lifecycle::{DeletionReceipt, LifecycleEngine};
pub use notifier::{BroadcastNotifier, Notifier, NullNotifier};
pub use runtime::Graveyard;
pub use stats::{Badge, CounterDrift, GlobalStats, LeaderboardEntry, StatsAggregator, UserStats};
