//! Tests for graveyard-core: ids, enums, projections, events, config, errors

use graveyard_core::config::AdminAllowList;
use graveyard_core::*;
use std::io::Write;

fn note(anonymous: bool) -> Note {
    Note {
        id: NoteId::new("n-1"),
        project_id: ProjectId::new("p-1"),
        author_id: UserId::new("author-secret"),
        body: "I tried this once".into(),
        is_anonymous: anonymous,
        created_at: chrono::Utc::now(),
    }
}

// ===========================================================================
// Identifiers
// ===========================================================================

#[test]
fn user_id_new_and_display() {
    let id = UserId::new("u-123");
    assert_eq!(id.as_str(), "u-123");
    assert_eq!(format!("{}", id), "u-123");
}

#[test]
fn generated_ids_are_unique() {
    let a = ProjectId::generate();
    let b = ProjectId::generate();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);
}

#[test]
fn ids_serialize_as_plain_strings() {
    let id = NoteId::from("n-9");
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""n-9""#);
    let back: NoteId = serde_json::from_str(r#""n-9""#).unwrap();
    assert_eq!(back, id);
}

// ===========================================================================
// Enums
// ===========================================================================

#[test]
fn status_serializes_with_hyphen() {
    assert_eq!(serde_json::to_string(&ProjectStatus::OnHold).unwrap(), r#""on-hold""#);
    assert_eq!(serde_json::to_string(&ProjectStatus::Abandoned).unwrap(), r#""abandoned""#);
    assert_eq!(serde_json::to_string(&ProjectStatus::Revived).unwrap(), r#""revived""#);
    assert_eq!("on-hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
}

#[test]
fn category_parses_case_insensitively() {
    assert_eq!("Code".parse::<Category>().unwrap(), Category::Code);
    assert_eq!(" business ".parse::<Category>().unwrap(), Category::Business);
    let err = "hardware".parse::<Category>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn role_defaults_to_user() {
    assert_eq!(Role::default(), Role::User);
    assert!(Role::Admin.is_admin());
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
}

// ===========================================================================
// Note projection
// ===========================================================================

#[test]
fn anonymous_author_hides_identity() {
    let author = NoteAuthor::of(&note(true));
    assert_eq!(author, NoteAuthor::Anonymous);
    assert!(author.user_id().is_none());
    let json = serde_json::to_string(&author).unwrap();
    assert_eq!(json, r#"{"kind":"anonymous"}"#);
    assert!(!json.contains("author-secret"));
}

#[test]
fn public_author_exposes_identity() {
    let author = NoteAuthor::of(&note(false));
    assert_eq!(author.user_id().map(|u| u.as_str()), Some("author-secret"));
    let json = serde_json::to_string(&author).unwrap();
    assert!(json.contains(r#""kind":"public""#));
}

// ===========================================================================
// Patches and filters
// ===========================================================================

#[test]
fn patch_leaves_status_and_revivers_alone() {
    let now = chrono::Utc::now();
    let mut project = Project {
        id: ProjectId::new("p"),
        owner_id: UserId::new("owner"),
        title: "Old".into(),
        description: "desc".into(),
        category: Category::Code,
        status: ProjectStatus::Revived,
        started_on: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        abandoned_on: None,
        link: None,
        pitch_asset: None,
        revived_by: vec![UserId::new("b")],
        created_at: now,
        updated_at: now,
    };
    let patch = ProjectPatch {
        title: Some("  New title ".into()),
        category: Some(Category::Content),
        ..ProjectPatch::default()
    };
    assert!(!patch.is_empty());
    patch.apply_to(&mut project);
    assert_eq!(project.title, "New title");
    assert_eq!(project.category, Category::Content);
    assert_eq!(project.status, ProjectStatus::Revived);
    assert_eq!(project.revived_by, vec![UserId::new("b")]);
    assert!(ProjectPatch::default().is_empty());
}

#[test]
fn patch_null_clears_and_absent_keeps() {
    let patch: ProjectPatch =
        serde_json::from_str(r#"{"link": null, "pitch_asset": "deck.pdf"}"#).unwrap();
    assert_eq!(patch.link, Some(None));
    assert_eq!(patch.pitch_asset, Some(Some("deck.pdf".to_string())));
    assert_eq!(patch.abandoned_on, None);
    assert!(!patch.is_empty());

    let now = chrono::Utc::now();
    let mut project = Project {
        id: ProjectId::new("p"),
        owner_id: UserId::new("a"),
        title: "T".into(),
        description: "D".into(),
        category: Category::Code,
        status: ProjectStatus::Abandoned,
        started_on: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        abandoned_on: chrono::NaiveDate::from_ymd_opt(2020, 6, 1),
        link: Some("https://old.example".into()),
        pitch_asset: None,
        revived_by: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    patch.apply_to(&mut project);
    assert_eq!(project.link, None);
    assert_eq!(project.pitch_asset.as_deref(), Some("deck.pdf"));
    assert!(project.abandoned_on.is_some());
}

// ===========================================================================
// Events
// ===========================================================================

#[test]
fn project_revived_envelope() {
    let event = LedgerEvent::ProjectRevived {
        project_id: ProjectId::new("p-1"),
        reviver_id: UserId::new("b"),
        owner_id: UserId::new("a"),
    };
    let msg = EventMessage::from(&event);
    assert_eq!(msg.event, "project_revived");
    assert_eq!(msg.data["project_id"], "p-1");
    assert_eq!(msg.data["reviver_id"], "b");
    assert_eq!(msg.data["owner_id"], "a");
    assert_eq!(event.project_id().map(|p| p.as_str()), Some("p-1"));
}

#[test]
fn leaderboard_changed_has_empty_data() {
    let msg = EventMessage::from(&LedgerEvent::LeaderboardChanged {});
    assert_eq!(msg.to_json(), r#"{"event":"leaderboard_changed","data":{}}"#);
}

#[test]
fn note_added_for_anonymous_note_carries_no_author() {
    let n = note(true);
    let event = LedgerEvent::NoteAdded {
        project_id: n.project_id.clone(),
        note_id: n.id.clone(),
        visible_author: NoteAuthor::of(&n),
    };
    let json = EventMessage::from(&event).to_json();
    assert!(!json.contains("author-secret"));
    assert!(json.contains("anonymous"));
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn config_defaults() {
    let config = GraveyardConfig::default();
    assert!(config.accounts.admin_emails.is_empty());
    assert_eq!(config.leaderboard.default_limit, 10);
    assert_eq!(config.notifier.channel_capacity, 256);
    assert!(config.storage.snapshot_path.is_none());
}

#[test]
fn config_partial_toml_keeps_other_defaults() {
    let config = GraveyardConfig::from_toml(
        r#"
        [accounts]
        admin_emails = ["Boss@Example.com"]

        [leaderboard]
        max_limit = 25
        "#,
    )
    .unwrap();
    assert_eq!(config.leaderboard.max_limit, 25);
    assert_eq!(config.leaderboard.default_limit, 10);
    assert_eq!(config.notes.max_body_chars, 4_000);
    assert!(config.admin_allow_list().contains("boss@example.com"));
}

#[test]
fn config_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraveyardConfig::load(&dir.path().join("nope.toml"));
    assert_eq!(config.projects.max_title_chars, 120);
}

#[test]
fn config_load_invalid_file_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is [not toml").unwrap();
    let config = GraveyardConfig::load(file.path());
    assert_eq!(config.leaderboard.max_limit, 100);
}

#[test]
fn config_toml_roundtrip() {
    let mut config = GraveyardConfig::default();
    config.accounts.admin_emails = vec!["a@b.c".into()];
    let text = config.to_toml();
    let back = GraveyardConfig::from_toml(&text).unwrap();
    assert_eq!(back.accounts.admin_emails, vec!["a@b.c".to_string()]);
}

#[test]
fn empty_allow_list() {
    let list = AdminAllowList::default();
    assert!(list.is_empty());
    assert!(!list.contains("anyone@example.com"));
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn error_kinds() {
    assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
    assert_eq!(Error::not_found("project", "p-1").kind(), ErrorKind::NotFound);
    assert_eq!(Error::forbidden("x").kind(), ErrorKind::Forbidden);
    assert_eq!(Error::conflict("x").kind(), ErrorKind::Conflict);
    assert_eq!(Error::store_unavailable("x").kind(), ErrorKind::StoreUnavailable);
}

#[test]
fn error_display() {
    let e = Error::not_found("project", "p-1");
    assert_eq!(e.to_string(), "project not found: p-1");
    let e = Error::forbidden("not the owner");
    assert_eq!(e.to_string(), "forbidden: not the owner");
}

#[test]
fn only_store_unavailable_is_retryable() {
    assert!(Error::store_unavailable("down").is_retryable());
    assert!(!Error::conflict("dup").is_retryable());
    assert!(!Error::validation("bad").is_retryable());
}

#[test]
fn error_from_io_and_json() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: Error = io_err.into();
    assert!(matches!(e, Error::IoError(_)));
    assert_eq!(e.kind(), ErrorKind::Internal);

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let e: Error = json_err.into();
    assert!(matches!(e, Error::JsonError(_)));
}
