//! Lifecycle orchestration (spec.md §4.10 "Service lifecycle" and §5 "Concurrency model"). Three
//! loops run concurrently under a shared [`task_executor::TaskExecutor`]: the duty fetch-and-log
//! cycle, the identifier registry refresh, and key-manager health probing. A SIGINT/SIGTERM
//! triggers a bounded-wait graceful shutdown; in `cicd-*` modes the fetch loop itself decides
//! when to terminate the whole process.

use crate::cicd::{self, Decision};
use crate::config::{Config, Mode};
use crate::duties;
use crate::duty_log;
use crate::duty_store::DutyStore;
use crate::identifiers::registry::IdentifierRegistry;
use crate::identifiers::{parse_raw_identifier, resolve::resolve};
use crate::node_pool::{BeaconNodePool, KeyManagerPool};
use crate::slot_clock::SlotClock;
use slog::{info, warn, Logger};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use task_executor::TaskExecutor;

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

pub struct Service {
    pub config: Config,
    pub beacon_pool: Arc<BeaconNodePool>,
    pub key_manager_pool: Arc<KeyManagerPool>,
    pub registry: Arc<IdentifierRegistry>,
    pub duty_store: Arc<DutyStore>,
    pub clock: SlotClock,
    pub log: Logger,
}

impl Service {
    /// Run every lifecycle loop to completion. Returns the process exit code: `0` unless a
    /// `cicd-*` mode decided duties are too imminent, in which case `1`.
    pub async fn run(self, executor: TaskExecutor) -> i32 {
        let exit_code = Arc::new(AtomicI32::new(0));
        let start = Instant::now();

        self.spawn_fetch_loop(&executor, exit_code.clone(), start);
        self.spawn_identifier_refresh_loop(&executor);
        self.spawn_key_manager_probe_loop(&executor);

        let mut exit = executor.exit();
        let _ = exit.changed().await;
        info!(self.log, "Shutdown requested, waiting for tasks to wind down");
        tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;

        exit_code.load(Ordering::SeqCst)
    }

    fn spawn_fetch_loop(&self, executor: &TaskExecutor, exit_code: Arc<AtomicI32>, start: Instant) {
        let beacon_pool = self.beacon_pool.clone();
        let registry = self.registry.clone();
        let duty_store = self.duty_store.clone();
        let clock = self.clock;
        let config = self.config.clone();
        let log = executor.log().clone();
        let mut exit = executor.exit();

        executor.spawn(
            async move {
                loop {
                    if duty_store.is_fresh(&registry, &clock) {
                        // Nothing to recompute this cycle; the stored list is still valid.
                    } else {
                        let snapshot = registry.snapshot();
                        registry.take_updated();
                        let duties = duties::fetch_all(
                            &snapshot,
                            &beacon_pool,
                            &clock,
                            config.omit_attestation_duties,
                            config.max_attestation_duty_logs,
                            &log,
                        )
                        .await;
                        duty_store.set(duties);
                    }

                    let duties = duty_store.get();
                    if config.mode == Mode::Log {
                        duty_log::render(&duties, &registry, &clock, &config, &log);
                    }

                    if config.mode.is_cicd() {
                        let waited = start.elapsed();
                        match cicd::evaluate(config.mode, &duties, &clock, &config, waited) {
                            Decision::Continue => {}
                            Decision::Exit(code) => {
                                exit_code.store(code, Ordering::SeqCst);
                                info!(log, "CI/CD terminator decided to exit"; "code" => code);
                                return;
                            }
                        }
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(config.interval)) => {}
                        _ = exit.changed() => return,
                    }
                }
            },
            "duty-fetch-loop",
        );
    }

    /// Every `--validator-update-interval` minutes, re-read `--validators`/`--validators-file`
    /// and re-fetch keystores/remote keys from every healthy key-manager endpoint, then
    /// republish the union as the new registry snapshot, per spec.md §4.4 "Interval refresh".
    fn spawn_identifier_refresh_loop(&self, executor: &TaskExecutor) {
        let beacon_pool = self.beacon_pool.clone();
        let key_manager_pool = self.key_manager_pool.clone();
        let registry = self.registry.clone();
        let cli_validators = self.config.validators.clone();
        let validators_file = self.config.validators_file.clone();
        let interval = Duration::from_secs(self.config.validator_update_interval);
        let log = executor.log().clone();
        let mut exit = executor.exit();

        executor.spawn(
            async move {
                loop {
                    let mut raw = Vec::new();

                    for token in &cli_validators {
                        match crate::identifiers::parser::parse_raw_identifier(token) {
                            Ok(r) => raw.push(r),
                            Err(reason) => {
                                warn!(log, "Malformed --validators identifier"; "reason" => reason)
                            }
                        }
                    }

                    if let Some(path) = &validators_file {
                        match std::fs::read_to_string(path) {
                            Ok(contents) => {
                                let (parsed, warnings) =
                                    crate::identifiers::parser::parse_many(contents.lines());
                                for reason in &warnings {
                                    warn!(log, "Malformed identifier in validators file"; "reason" => reason);
                                }
                                raw.extend(parsed);
                            }
                            Err(e) => {
                                warn!(log, "Could not read validators file"; "path" => %path.display(), "error" => %e);
                            }
                        }
                    }

                    if !key_manager_pool.is_empty() {
                        raw.extend(
                            crate::identifiers::resolve::fetch_key_manager_raw(
                                &key_manager_pool,
                                &log,
                            )
                            .await,
                        );
                    }

                    let resolved = resolve(&raw, &beacon_pool, &log).await;
                    registry.publish(resolved);

                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = exit.changed() => return,
                    }
                }
            },
            "identifier-refresh-loop",
        );
    }

    fn spawn_key_manager_probe_loop(&self, executor: &TaskExecutor) {
        if self.key_manager_pool.is_empty() {
            return;
        }
        let pool = self.key_manager_pool.clone();
        let interval = Duration::from_secs(self.config.validator_update_interval);
        let mut exit = executor.exit();

        executor.spawn(
            async move {
                loop {
                    pool.probe_all().await;
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = exit.changed() => return,
                    }
                }
            },
            "key-manager-probe-loop",
        );
    }
}

/// Resolve the initial identifier set from `--validators` (inline tokens), `--validators-file`
/// (one token per line), and every configured key-manager endpoint (not yet health-probed at
/// this point, so each is queried directly rather than through [`KeyManagerPool`]'s healthy
/// set), per spec.md §4.1 "Startup" / §4.4 "key manager endpoint" input source.
pub async fn initial_registry(
    config: &Config,
    beacon_pool: &BeaconNodePool,
    key_manager_clients: &[eth2::KeyManagerHttpClient],
    log: &Logger,
) -> IdentifierRegistry {
    let tokens: Vec<String> = if !config.validators.is_empty() {
        config.validators.clone()
    } else if let Some(path) = &config.validators_file {
        match std::fs::read_to_string(path) {
            Ok(contents) => contents.lines().map(|l| l.to_string()).collect(),
            Err(e) => {
                warn!(log, "Could not read validators file at startup"; "path" => %path.display(), "error" => %e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let mut raw = Vec::new();
    for token in &tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match parse_raw_identifier(token) {
            Ok(r) => raw.push(r),
            Err(reason) => warn!(log, "Malformed identifier at startup"; "reason" => reason),
        }
    }

    for client in key_manager_clients {
        let keystores = crate::request::retrying_key_manager_call(log, || client.get_keystores()).await;
        for entry in keystores {
            match parse_raw_identifier(&entry.validating_pubkey) {
                Ok(r) => raw.push(r),
                Err(reason) => warn!(log, "Key manager returned a malformed pubkey"; "reason" => reason),
            }
        }
    }

    let resolved = resolve(&raw, beacon_pool, log).await;
    IdentifierRegistry::new(resolved)
}
