use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steamsesh_adapters::{
    LoopbackConfig, LoopbackRegistry, LoopbackSessionProvider, StaticLocalPlayer, SystemClock,
};
use steamsesh_app::{CoordinatorConfig, SessionCoordinator, SessionError};

use crate::config::HostConfig;
use crate::input::{HostCommand, HELP};
use crate::notifier;

/// How often in-flight requests are checked against the request timeout
const TIMEOUT_TICK: Duration = Duration::from_millis(250);

/// Read stdin on a plain thread; a blocked read must not hold up runtime
/// shutdown.
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("spawning stdin reader")?;
    Ok(rx)
}

fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }
        tracing::info!("Received Ctrl+C, shutting down");
        cancel_token.cancel();
    });
}

pub async fn run() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "steamsesh_host=debug,steamsesh_app=debug,steamsesh_adapters=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting SteamSesh host");

    let host_config = HostConfig::from_env();
    let config = CoordinatorConfig::from_env();
    tracing::info!(
        player = %host_config.player_name,
        session = %config.session_name,
        max_players = config.public_connections,
        lan = config.is_lan,
        destroy_policy = %config.destroy_policy,
        "Configuration loaded"
    );

    let registry = Arc::new(LoopbackRegistry::new());
    for peer in &host_config.demo_peers {
        let session_id = registry
            .seed_peer(peer)
            .with_context(|| format!("seeding demo peer {peer}"))?;
        tracing::debug!(peer = %peer, session_id = %session_id, "Seeded demo peer");
    }

    let provider = LoopbackSessionProvider::new(
        Arc::clone(&registry),
        host_config.player_name.clone(),
        LoopbackConfig {
            latency: host_config.loopback_latency,
            ..LoopbackConfig::default()
        },
    );
    let coordinator = SessionCoordinator::new(
        config,
        Arc::new(StaticLocalPlayer::signed_in(host_config.player_name.clone())),
        Arc::new(SystemClock::new()),
    );

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    let notifier_task = tokio::spawn(notifier::run(
        coordinator.subscribe(),
        cancel_token.clone(),
    ));
    coordinator.attach_provider(Arc::new(provider));

    let tick_task = {
        let coordinator = coordinator.clone();
        let cancel = cancel_token.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TIMEOUT_TICK);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        coordinator.expire_stale_requests();
                    }
                }
            }
        })
    };

    println!("{HELP}");
    let mut lines = spawn_stdin_reader()?;
    loop {
        let line = tokio::select! {
            _ = cancel_token.cancelled() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed");
            break;
        };
        match line.parse::<HostCommand>() {
            Ok(HostCommand::Quit) => break,
            Ok(command) => handle_command(&coordinator, command),
            Err(crate::input::InputError::Empty) => {}
            Err(e) => println!("{e}"),
        }
    }

    cancel_token.cancel();
    if let Err(e) = tick_task.await {
        tracing::warn!(error = %e, "Timeout ticker ended abnormally");
    }
    if let Err(e) = notifier_task.await {
        tracing::warn!(error = %e, "Notifier ended abnormally");
    }
    tracing::info!("SteamSesh host stopped");
    Ok(())
}

fn handle_command(coordinator: &SessionCoordinator, command: HostCommand) {
    let result: Result<(), SessionError> = match command {
        HostCommand::Create => coordinator.request_create_session(),
        HostCommand::Find => coordinator.request_find_sessions(),
        HostCommand::Join(index) => coordinator.request_join_session(index),
        HostCommand::Destroy => coordinator.request_destroy_session(),
        HostCommand::Snapshot => {
            for line in notifier::render_snapshot(&coordinator.snapshot()) {
                println!("{line}");
            }
            Ok(())
        }
        HostCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        HostCommand::Quit => Ok(()),
    };
    if let Err(e) = result {
        tracing::debug!(command = ?command, error = %e, "Request rejected");
        println!("[session!] {e}");
    }
}
