//! End-to-end runs of the watcher against a fake backend

mod common;

use std::sync::Arc;
use std::time::Duration;

use openapi_client::models::{DeploymentStatus, ProjectStatus, RedeployResponse};
use shorwatch::app::commands::Command;
use shorwatch::app::options::WatchOptions;
use shorwatch::app::run::{run, RunOutcome};
use tokio::sync::mpsc;
use tokio_test::assert_ok;

use common::{
    connected, deployment, details, logs, repo, status, FakeApi, FakeCredentials, Reply, PROJECT,
};

fn options() -> WatchOptions {
    WatchOptions {
        project_id: PROJECT.to_string(),
        ..Default::default()
    }
}

fn ready_backend() -> Arc<FakeApi> {
    let api = FakeApi::new();
    api.connection.push(Reply::Ok(connected(true)));
    api.repos.push(Reply::Ok(vec![repo("demo")]));
    api
}

#[tokio::test(start_paused = true)]
async fn test_follows_build_until_live() {
    let api = ready_backend();
    api.status
        .push(Reply::Ok(status(ProjectStatus::Building)))
        .push(Reply::Ok(status(ProjectStatus::Live)));
    api.details.push(Reply::Ok(details(vec![
        deployment("d-1", DeploymentStatus::InProgress),
        deployment("d-0", DeploymentStatus::Succeeded),
    ])));
    api.logs("d-1")
        .push(Reply::Ok(logs(&["Installing deps"], DeploymentStatus::InProgress)))
        .push(Reply::Ok(logs(
            &["Installing deps", "Build complete"],
            DeploymentStatus::Succeeded,
        )));

    let (_commands_tx, commands_rx) = mpsc::unbounded_channel();
    let mut out = Vec::new();
    let outcome = assert_ok!(
        run(
            options(),
            api.clone(),
            FakeCredentials::new(),
            commands_rx,
            &mut out,
            std::future::pending::<()>(),
        )
        .await
    );

    assert_eq!(outcome, RunOutcome::Completed(ProjectStatus::Live));
    assert_eq!(api.count("logs:d-1"), 2);
    assert_eq!(api.count("logs:d-0"), 0);

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Installing deps"));
    assert!(out.contains("Build complete"));
    assert_eq!(out.matches("Installing deps").count(), 1);
    assert!(out.contains("Following deployment"));
}

#[tokio::test(start_paused = true)]
async fn test_not_connected_waits_for_connect_command() {
    let api = FakeApi::new();
    api.connection
        .push(Reply::Ok(connected(false)))
        .push(Reply::Ok(connected(true)));
    api.repos.push(Reply::Ok(vec![]));
    api.status.push(Reply::Ok(status(ProjectStatus::Live)));
    api.details.push(Reply::Ok(details(vec![deployment(
        "d-1",
        DeploymentStatus::Succeeded,
    )])));

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn({
        let api = api.clone();
        async move {
            let mut out = Vec::new();
            let outcome = run(
                options(),
                api,
                FakeCredentials::new(),
                commands_rx,
                &mut out,
                std::future::pending::<()>(),
            )
            .await;
            (outcome, out)
        }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(api.count("auth_url"), 1);
    assert_eq!(api.count("project_status"), 0);

    commands_tx.send("connected".parse::<Command>().unwrap()).unwrap();
    let (outcome, out) = driver.await.unwrap();

    assert_eq!(outcome.unwrap(), RunOutcome::Completed(ProjectStatus::Live));
    assert_eq!(api.count("connection_status"), 2);
    assert!(String::from_utf8(out).unwrap().contains("github.com/login/oauth"));
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_ends_the_run() {
    let api = FakeApi::new();
    api.connection.push(Reply::Unauthorized);
    let credentials = FakeCredentials::new();

    let (_commands_tx, commands_rx) = mpsc::unbounded_channel();
    let outcome = run(
        options(),
        api.clone(),
        credentials.clone(),
        commands_rx,
        std::io::sink(),
        std::future::pending::<()>(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, RunOutcome::SignedOut);
    assert_eq!(credentials.sign_outs(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_redeploy_restarts_observation() {
    let api = ready_backend();
    api.status
        .push(Reply::Ok(status(ProjectStatus::Live)))
        .push(Reply::Ok(status(ProjectStatus::Pending)))
        .push(Reply::Ok(status(ProjectStatus::Live)));
    api.details.push(Reply::Ok(details(vec![])));
    api.redeploy.push(Reply::Ok(RedeployResponse {
        project_id: PROJECT.to_string(),
        message: "Redeployment started".to_string(),
        status: ProjectStatus::Pending,
    }));

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn({
        let api = api.clone();
        async move {
            let mut out = Vec::new();
            let outcome = run(
                WatchOptions {
                    follow: true,
                    ..options()
                },
                api,
                FakeCredentials::new(),
                commands_rx,
                &mut out,
                tokio::time::sleep(Duration::from_secs(20)),
            )
            .await;
            (outcome, out)
        }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(api.count("project_status"), 1);
    commands_tx.send(Command::Redeploy).unwrap();

    let (outcome, out) = driver.await.unwrap();
    assert_eq!(outcome.unwrap(), RunOutcome::Shutdown);
    assert_eq!(api.count("redeploy"), 1);
    assert_eq!(api.count("project_status"), 3);
    assert!(String::from_utf8(out).unwrap().contains("Redeployment started"));
}

#[tokio::test(start_paused = true)]
async fn test_quit_command() {
    let api = ready_backend();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    commands_tx.send(Command::Quit).unwrap();

    let outcome = run(
        options(),
        api,
        FakeCredentials::new(),
        commands_rx,
        std::io::sink(),
        std::future::pending::<()>(),
    )
    .await
    .unwrap();

    // Quit is honoured during initialization already
    assert_eq!(outcome, RunOutcome::Quit);
}
