//! Shorwatch - Entry Point
//!
//! Follows a project's build pipeline and deployment logs from the terminal.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use shorwatch::api::{BackendApi, DashboardApi};
use shorwatch::app::commands::Command;
use shorwatch::app::options::WatchOptions;
use shorwatch::app::run::{run, RunOutcome};
use shorwatch::authn::provider::{CredentialProvider, FileCredentials};
use shorwatch::filesys::file::File;
use shorwatch::http::client::HttpClient;
use shorwatch::logs::{init_logging, LogLevel, LogOptions};
use shorwatch::storage::layout::StorageLayout;
use shorwatch::storage::settings::Settings;
use shorwatch::utils::version_info;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    // Stdin is read on a blocking thread, so exit explicitly instead of
    // waiting for the runtime to join it
    let code = match watch(&cli_args).await {
        Ok(RunOutcome::Completed(status)) => {
            info!("Finished with project status {}", status);
            0
        }
        Ok(RunOutcome::SignedOut) => 2,
        Ok(outcome) => {
            info!("Stopped: {:?}", outcome);
            0
        }
        Err(e) => {
            error!("Failed to run the watcher: {e:#}");
            eprintln!("Error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn watch(cli_args: &HashMap<String, String>) -> anyhow::Result<RunOutcome> {
    let layout = StorageLayout::default();

    // Retrieve the settings file
    let settings_file = match cli_args.get("settings") {
        Some(path) => File::new(PathBuf::from(path)),
        None => layout.settings_file(),
    };
    let mut settings = Settings::load(&settings_file)
        .await
        .with_context(|| format!("Unable to read settings file {}", settings_file.path().display()))?;

    if let Some(base_url) = cli_args.get("base-url") {
        settings.backend.base_url = base_url.clone();
    }
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level
            .parse::<LogLevel>()
            .map_err(anyhow::Error::msg)?;
    }
    settings.validate()?;

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: settings.log_to_file.then(|| layout.logs_dir()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let Some(project_id) = cli_args.get("project") else {
        bail!("Missing --project=<id>");
    };

    let mut options = WatchOptions::from_settings(project_id.clone(), &settings);
    options.follow = cli_args.contains_key("follow");

    let http_client = Arc::new(
        HttpClient::new(&options.backend_base_url, options.request_timeout)
            .context("Invalid backend URL")?,
    );
    let file_credentials = FileCredentials::new(Arc::new(layout.credentials_file()));
    if let Some(token) = cli_args.get("token") {
        file_credentials
            .store(token)
            .await
            .context("Unable to store the token")?;
    }
    let credentials: Arc<dyn CredentialProvider> = Arc::new(file_credentials);
    let api: Arc<dyn DashboardApi> = Arc::new(BackendApi::new(http_client, credentials.clone()));

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    tokio::spawn(read_commands(commands_tx));

    info!("Running shorwatch with options: {:?}", options);
    let outcome = run(
        options,
        api,
        credentials,
        commands_rx,
        std::io::stdout(),
        await_shutdown_signal(),
    )
    .await?;
    Ok(outcome)
}

/// Forward stdin lines as commands until stdin closes or the run loop goes away
async fn read_commands(tx: mpsc::UnboundedSender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match line.parse::<Command>() {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                Err(e) => eprintln!("{e}"),
            },
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                return;
            }
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                warn!("Unable to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
