//! End-to-end runs of the graveyard CLI against a snapshot on disk

use clap::Parser;
use graveyard::{run, Cli};
use serde_json::Value;
use std::path::Path;

async fn graveyard(ledger: &Path, args: &[&str]) -> anyhow::Result<Value> {
    let ledger = ledger.to_string_lossy().into_owned();
    let mut argv = vec!["graveyard", "--config", "/nonexistent/graveyard.toml", "--ledger", ledger.as_str()];
    argv.extend_from_slice(args);
    let output = run(Cli::parse_from(argv)).await?;
    Ok(serde_json::from_str(&output)?)
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn revival_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");

    graveyard(&ledger, &["init"]).await.unwrap();
    assert!(graveyard(&ledger, &["init"]).await.is_err());

    let ann = graveyard(&ledger, &["signup", "--name", "Ann", "--email", "ann@example.com"])
        .await
        .unwrap();
    let bo = graveyard(&ledger, &["signup", "--name", "Bo", "--email", "bo@example.com"])
        .await
        .unwrap();

    let project = graveyard(
        &ledger,
        &[
            "post",
            "--owner",
            &id(&ann),
            "--title",
            "Tiny VM",
            "--description",
            "stack machine, no GC yet",
            "--category",
            "code",
            "--started",
            "2022-02-01",
        ],
    )
    .await
    .unwrap();
    assert_eq!(project["status"], "abandoned");

    for _ in 0..2 {
        let revived = graveyard(
            &ledger,
            &["revive", "--project", &id(&project), "--reviver", &id(&bo), "--link", "https://vm.example"],
        )
        .await
        .unwrap();
        assert_eq!(revived["status"], "revived");
        assert_eq!(revived["revived_by"].as_array().unwrap().len(), 1);
    }

    let board = graveyard(&ledger, &["leaderboard", "--limit", "1"]).await.unwrap();
    assert_eq!(board[0]["user_id"], id(&bo).as_str());
    assert_eq!(board[0]["revival_count"], 1);
    assert_eq!(board[0]["rank"], 1);

    let audit = graveyard(&ledger, &["audit"]).await.unwrap();
    assert!(audit.as_array().unwrap().is_empty());

    let stats = graveyard(&ledger, &["stats"]).await.unwrap();
    assert_eq!(stats["revived"], 1);
    assert_eq!(stats["revivals"], 1);
}

#[tokio::test]
async fn anonymous_note_hidden_in_cli_output() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    graveyard(&ledger, &["init"]).await.unwrap();

    let ann = graveyard(&ledger, &["signup", "--name", "Ann", "--email", "ann@example.com"])
        .await
        .unwrap();
    let cy = graveyard(&ledger, &["signup", "--name", "Cy", "--email", "cy@example.com"])
        .await
        .unwrap();
    let project = graveyard(
        &ledger,
        &[
            "post", "--owner", &id(&ann), "--title", "Zine", "--description", "issue 2 never shipped",
            "--category", "content", "--started", "2020-09-09",
        ],
    )
    .await
    .unwrap();

    let note = graveyard(
        &ledger,
        &["note", "--project", &id(&project), "--author", &id(&cy), "--body", "ship it", "--anonymous"],
    )
    .await
    .unwrap();
    assert_eq!(note["author"]["kind"], "anonymous");

    let listed = graveyard(&ledger, &["notes", "--project", &id(&project), "--as", &id(&ann)])
        .await
        .unwrap();
    assert!(!listed.to_string().contains(&id(&cy)));

    let err = graveyard(&ledger, &["notes", "--project", &id(&project), "--as", &id(&cy)])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("forbidden"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_do_not_lose_writes() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    graveyard(&ledger, &["init"]).await.unwrap();

    let runs = (0..8).map(|i| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            let email = format!("user{}@example.com", i);
            let name = format!("User {}", i);
            graveyard(&ledger, &["signup", "--name", &name, "--email", &email]).await
        })
    });
    for handle in runs.collect::<Vec<_>>() {
        handle.await.unwrap().unwrap();
    }

    let stats = graveyard(&ledger, &["stats"]).await.unwrap();
    assert_eq!(stats["users"], 8);
    assert!(dir.path().join("ledger.json.lock").exists());
}

#[tokio::test]
async fn missing_ledger_path_is_an_error() {
    let cli = Cli::parse_from(["graveyard", "--config", "/nonexistent/graveyard.toml", "audit"]);
    assert!(run(cli).await.is_err());
}

#[tokio::test]
async fn dump_config_prints_defaults() {
    let cli = Cli::parse_from(["graveyard", "--config", "/nonexistent/graveyard.toml", "dump-config"]);
    let toml = run(cli).await.unwrap();
    assert!(toml.contains("max_limit = 100"));
    assert!(toml.contains("[notes]"));
}
