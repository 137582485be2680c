//! Command surface of the `graveyard` binary
//!
//! Every invocation loads the ledger snapshot, runs one operation through the
//! engines, saves the snapshot if the operation wrote anything, and renders the
//! result as JSON. An advisory lock on `<ledger>.lock` spans the whole cycle:
//! writers take it exclusively, readers shared, so concurrent invocations on one
//! ledger file serialize instead of losing writes.

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fs2::FileExt;
use graveyard_core::{
    Caller, Category, EventMessage, GraveyardConfig, NewProject, NewUser, NoteId, ProjectFilter,
    ProjectId, ProjectStatus, UserId,
};
use graveyard_engine::{BroadcastNotifier, Graveyard};
use graveyard_ledger::snapshot::{self, LedgerSnapshot};
use graveyard_ledger::MemoryLedger;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "graveyard", about = "Ledger of abandoned projects and who revived them")]
pub struct Cli {
    /// Ledger snapshot file. Overrides `storage.snapshot_path` from the config.
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Path to config file (TOML).
    #[arg(long, default_value = "graveyard.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty ledger snapshot.
    Init {
        /// Overwrite an existing snapshot.
        #[arg(long)]
        force: bool,
    },
    /// Register a user.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Resolve a user by email, applying admin promotion.
    Login {
        #[arg(long)]
        email: String,
    },
    /// Publish an abandoned project.
    Post {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: Category,
        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        started: NaiveDate,
        /// Date the project was abandoned (YYYY-MM-DD).
        #[arg(long)]
        abandoned: Option<NaiveDate>,
        #[arg(long)]
        link: Option<String>,
    },
    /// Credit a user with reviving a project.
    Revive {
        #[arg(long)]
        project: String,
        #[arg(long)]
        reviver: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        link: Option<String>,
    },
    /// Attach a note to a project.
    Note {
        #[arg(long)]
        project: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        anonymous: bool,
    },
    /// List notes on a project as the given user.
    Notes {
        #[arg(long)]
        project: String,
        #[arg(long = "as")]
        as_user: String,
    },
    /// Delete a note as the given user.
    DeleteNote {
        #[arg(long)]
        note: String,
        #[arg(long = "as")]
        as_user: String,
    },
    /// Delete a project as the given user.
    DeleteProject {
        #[arg(long)]
        project: String,
        #[arg(long = "as")]
        as_user: String,
    },
    /// Delete a user as the given admin.
    DeleteUser {
        #[arg(long)]
        user: String,
        #[arg(long = "as")]
        as_user: String,
    },
    /// List projects, newest first.
    Projects {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        status: Option<ProjectStatus>,
        #[arg(long)]
        category: Option<Category>,
    },
    /// Revival history of a project.
    Revivals {
        #[arg(long)]
        project: String,
    },
    /// Per-user stats, or ledger-wide counts when no user is given.
    Stats {
        #[arg(long)]
        user: Option<String>,
    },
    /// Top revivers.
    Leaderboard {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Report users whose revival counter drifted from their revival events.
    Audit,
    /// Print the effective config as TOML.
    DumpConfig,
}

impl Command {
    fn writes(&self) -> bool {
        !matches!(
            self,
            Command::Notes { .. }
                | Command::Projects { .. }
                | Command::Revivals { .. }
                | Command::Stats { .. }
                | Command::Leaderboard { .. }
                | Command::Audit
                | Command::DumpConfig
        )
    }
}

/// Run one command and return its rendered output.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = GraveyardConfig::load(&cli.config);
    if let Command::DumpConfig = cli.command {
        return Ok(config.to_toml());
    }

    let path = cli
        .ledger
        .clone()
        .or_else(|| config.storage.snapshot_path.clone())
        .ok_or_else(|| anyhow!("no ledger file: pass --ledger or set storage.snapshot_path"))?;

    let exclusive = cli.command.writes();
    let lock_target = path.clone();
    let _lock = tokio::task::spawn_blocking(move || lock_ledger(&lock_target, exclusive))
        .await
        .context("ledger lock task failed")??;

    if let Command::Init { force } = cli.command {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        snapshot::save(&path, &LedgerSnapshot::empty())?;
        info!("Initialized empty ledger at {}", path.display());
        return render(&serde_json::json!({ "ledger": path }));
    }

    let restored = snapshot::load(&path)
        .with_context(|| format!("reading ledger {}", path.display()))?;
    let ledger = Arc::new(MemoryLedger::from_snapshot(restored)?);
    let notifier = Arc::new(BroadcastNotifier::new(config.notifier.channel_capacity));
    let mut events = notifier.subscribe();
    let graveyard = Graveyard::new(ledger.clone(), notifier.clone(), &config);

    let output = execute(&graveyard, &cli.command).await?;

    if cli.command.writes() {
        snapshot::save(&path, &ledger.snapshot().await)?;
    }
    while let Ok(event) = events.try_recv() {
        info!("Event: {}", EventMessage::from(&event).to_json());
    }
    Ok(output)
}

async fn execute(graveyard: &Graveyard, command: &Command) -> anyhow::Result<String> {
    match command {
        Command::Signup { name, email } => {
            let user = graveyard
                .accounts()
                .sign_up(NewUser {
                    display_name: name.clone(),
                    email: email.clone(),
                })
                .await?;
            render(&user)
        }
        Command::Login { email } => render(&graveyard.accounts().log_in(email).await?),
        Command::Post {
            owner,
            title,
            description,
            category,
            started,
            abandoned,
            link,
        } => {
            let payload = NewProject {
                title: Some(title.clone()),
                description: Some(description.clone()),
                category: Some(*category),
                started_on: Some(*started),
                abandoned_on: *abandoned,
                link: link.clone(),
                pitch_asset: None,
            };
            let project = graveyard
                .lifecycle()
                .create_project(&UserId::from(owner.as_str()), payload)
                .await?;
            render(&project)
        }
        Command::Revive {
            project,
            reviver,
            notes,
            link,
        } => {
            let project = graveyard
                .lifecycle()
                .revive_project(
                    &ProjectId::from(project.as_str()),
                    &UserId::from(reviver.as_str()),
                    notes,
                    link.as_deref(),
                )
                .await?;
            render(&project)
        }
        Command::Note {
            project,
            author,
            body,
            anonymous,
        } => {
            let view = graveyard
                .commentary()
                .post_note(
                    &ProjectId::from(project.as_str()),
                    &UserId::from(author.as_str()),
                    body,
                    *anonymous,
                )
                .await?;
            render(&view)
        }
        Command::Notes { project, as_user } => {
            let caller = resolve_caller(graveyard, as_user).await?;
            let notes = graveyard
                .commentary()
                .list_notes(&ProjectId::from(project.as_str()), &caller)
                .await?;
            render(&notes)
        }
        Command::DeleteNote { note, as_user } => {
            let caller = resolve_caller(graveyard, as_user).await?;
            let note_id = NoteId::from(note.as_str());
            graveyard.commentary().delete_note(&note_id, &caller).await?;
            render(&serde_json::json!({ "deleted": note_id }))
        }
        Command::DeleteProject { project, as_user } => {
            let caller = resolve_caller(graveyard, as_user).await?;
            let receipt = graveyard
                .lifecycle()
                .delete_project(&ProjectId::from(project.as_str()), &caller)
                .await?;
            render(&receipt)
        }
        Command::DeleteUser { user, as_user } => {
            let caller = resolve_caller(graveyard, as_user).await?;
            let receipt = graveyard
                .accounts()
                .delete_user(&UserId::from(user.as_str()), &caller)
                .await?;
            render(&receipt)
        }
        Command::Projects {
            owner,
            status,
            category,
        } => {
            let filter = ProjectFilter {
                owner: owner.as_deref().map(UserId::from),
                status: *status,
                category: *category,
            };
            render(&graveyard.lifecycle().list_projects(&filter).await?)
        }
        Command::Revivals { project } => {
            let revivals = graveyard
                .lifecycle()
                .list_revivals(&ProjectId::from(project.as_str()))
                .await?;
            render(&revivals)
        }
        Command::Stats { user: Some(user) } => {
            render(&graveyard.stats().user_stats(&UserId::from(user.as_str())).await?)
        }
        Command::Stats { user: None } => render(&graveyard.stats().global_stats().await?),
        Command::Leaderboard { limit } => render(&graveyard.stats().leaderboard(*limit).await?),
        Command::Audit => render(&graveyard.stats().audit_counters().await?),
        Command::Init { .. } | Command::DumpConfig => {
            bail!("{:?} is handled before the ledger is opened", command)
        }
    }
}

/// Open `<ledger>.lock` and block until the advisory lock is granted. The lock
/// is released when the returned file is dropped.
fn lock_ledger(path: &Path, exclusive: bool) -> anyhow::Result<File> {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    let lock_path = path.with_file_name(name);
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("opening ledger lock {}", lock_path.display()))?;
    if exclusive {
        file.lock_exclusive()
    } else {
        file.lock_shared()
    }
    .with_context(|| format!("locking {}", lock_path.display()))?;
    debug!("Holding {} lock on {}", if exclusive { "exclusive" } else { "shared" }, lock_path.display());
    Ok(file)
}

/// The CLI stands in for the API layer: it trusts the id it is given and
/// takes the role from the ledger.
async fn resolve_caller(graveyard: &Graveyard, user: &str) -> anyhow::Result<Caller> {
    let user = graveyard.accounts().get_user(&UserId::from(user)).await?;
    Ok(Caller::from(&user))
}

fn render<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
