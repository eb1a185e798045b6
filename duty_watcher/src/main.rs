//! Entry point: parse arguments, fetch genesis, resolve the initial validator set, then hand
//! off to [`duty_watcher::service::Service`] for the long-running lifecycle. Kept intentionally
//! thin, per spec.md §4.1 "Startup" — anything with real logic lives in the library so it can be
//! unit tested without a process boundary.

use clap::Parser;
use duty_watcher::config::{Args, Config};
use duty_watcher::error::Error;
use duty_watcher::node_pool::{BeaconNodePool, KeyManagerPool};
use duty_watcher::service::{self, Service};
use duty_watcher::slot_clock::SlotClock;
use eth2::{BeaconNodeHttpClient, KeyManagerHttpClient};
use sensitive_url::SensitiveUrl;
use slog::{crit, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

const HTTP_TIMEOUT: Duration = Duration::from_secs(12);

fn main() {
    let args = Args::parse();
    let code = match Config::from_args(args) {
        Ok(config) => {
            let log = logging::root_logger(config.log_level);
            let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
            runtime.block_on(run(config, log))
        }
        Err(e) => {
            eprintln!("configuration error: {e}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(config: Config, log: slog::Logger) -> i32 {
    let beacon_clients: Result<Vec<BeaconNodeHttpClient>, Error> = config
        .beacon_nodes
        .iter()
        .map(|url| BeaconNodeHttpClient::new(url.clone(), HTTP_TIMEOUT).map_err(Error::from))
        .collect();
    let beacon_clients = match beacon_clients {
        Ok(c) => c,
        Err(e) => {
            crit!(log, "Could not build beacon node clients"; "error" => %e);
            return 1;
        }
    };
    let beacon_pool = Arc::new(BeaconNodePool::new(beacon_clients, log.clone()));

    let genesis = match beacon_pool.select_healthy().await.get_beacon_genesis().await {
        Ok(g) => g,
        Err(e) => {
            crit!(log, "Could not fetch genesis from any beacon node"; "error" => %e);
            return 1;
        }
    };
    let clock = SlotClock::new(genesis.genesis_time);
    info!(log, "Fetched genesis"; "genesis_time" => genesis.genesis_time);

    let key_manager_clients = load_key_manager_clients(&config, &log);
    let key_manager_pool = Arc::new(KeyManagerPool::new(key_manager_clients.clone(), log.clone()));

    let registry = Arc::new(
        service::initial_registry(&config, &beacon_pool, &key_manager_clients, &log).await,
    );
    info!(log, "Resolved initial validator set"; "count" => registry.snapshot().len());

    let duty_store = Arc::new(duty_watcher::duty_store::DutyStore::default());

    if config.rest && !config.mode.is_cicd() {
        let addr = SocketAddr::new(
            config.rest_host.parse().unwrap_or_else(|_| [127, 0, 0, 1].into()),
            config.rest_port,
        );
        let rest_state = duty_watcher::rest::RestState {
            duty_store: duty_store.clone(),
            registry: registry.clone(),
            beacon_pool: beacon_pool.clone(),
            clock,
            log: log.clone(),
        };
        if let Err(e) = duty_watcher::rest::try_serve(addr, rest_state) {
            duty_watcher::rest::log_bind_failure(&log, addr, &e);
        }
    } else if config.rest && config.mode.is_cicd() {
        info!(log, "--rest flag ignored in cicd-* mode");
    }

    let (shutdown_tx, shutdown_rx) = task_executor::shutdown_channel();
    let executor = TaskExecutor::new(tokio::runtime::Handle::current(), shutdown_rx, log.clone());

    install_signal_handlers(shutdown_tx, log.clone());

    let service = Service {
        config,
        beacon_pool,
        key_manager_pool,
        registry,
        duty_store,
        clock,
        log: log.clone(),
    };

    service.run(executor).await
}

/// `--validator-nodes` names a file of key-manager base URLs, one per line, each optionally
/// carrying its bearer token as the URL's userinfo password (`http://:TOKEN@host:port`) — the
/// same convention [`sensitive_url::SensitiveUrl`] already masks in logs.
fn load_key_manager_clients(config: &Config, log: &slog::Logger) -> Vec<KeyManagerHttpClient> {
    let Some(path) = &config.validator_nodes else {
        return Vec::new();
    };
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            crit!(log, "Could not read --validator-nodes file"; "path" => %path.display(), "error" => %e);
            return Vec::new();
        }
    };

    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| match SensitiveUrl::parse(line) {
            Ok(url) => {
                let token = url.full().password().unwrap_or("").to_string();
                KeyManagerHttpClient::new(url, token, HTTP_TIMEOUT).ok()
            }
            Err(e) => {
                crit!(log, "Invalid key manager URL in --validator-nodes"; "line" => line, "error" => %e);
                None
            }
        })
        .collect()
}

#[cfg(unix)]
fn install_signal_handlers(shutdown_tx: task_executor::ShutdownSender, log: slog::Logger) {
    use tokio::signal::unix::{signal, SignalKind};
    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => info!(log, "Received SIGINT"),
            _ = sigterm.recv() => info!(log, "Received SIGTERM"),
        }
        task_executor::request_shutdown(&shutdown_tx, &log);
    });
}

#[cfg(not(unix))]
fn install_signal_handlers(shutdown_tx: task_executor::ShutdownSender, log: slog::Logger) {
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!(log, "Received Ctrl-C");
        task_executor::request_shutdown(&shutdown_tx, &log);
    });
}
