//! Load-balances and fails over between beacon nodes. The first configured node is primary; the
//! rest are backups consulted only when the primary (or whichever node is currently selected)
//! fails its health check.

use eth2::BeaconNodeHttpClient;
use parking_lot::Mutex;
use slog::{debug, warn, Logger};
use std::time::{Duration, Instant};

const USING_NODE_LOG_INTERVAL: Duration = Duration::from_secs(120);
const PRIMARY_DOWN_LOG_INTERVAL: Duration = Duration::from_secs(5);

struct Throttle {
    last_logged: Option<Instant>,
    interval: Duration,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            last_logged: None,
            interval,
        }
    }

    /// True the first time, or once `interval` has elapsed since the last `true`.
    fn should_log(&mut self) -> bool {
        let now = Instant::now();
        match self.last_logged {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_logged = Some(now);
                true
            }
        }
    }
}

struct State {
    selected: usize,
    healthy: bool,
    using_node_throttle: Throttle,
    primary_down_throttle: Throttle,
}

/// A fan-out of beacon node HTTP clients with primary/backup failover.
pub struct BeaconNodePool {
    clients: Vec<BeaconNodeHttpClient>,
    state: Mutex<State>,
    log: Logger,
}

impl BeaconNodePool {
    pub fn new(clients: Vec<BeaconNodeHttpClient>, log: Logger) -> Self {
        assert!(!clients.is_empty(), "at least one beacon node is required");
        Self {
            clients,
            state: Mutex::new(State {
                selected: 0,
                healthy: true,
                using_node_throttle: Throttle::new(USING_NODE_LOG_INTERVAL),
                primary_down_throttle: Throttle::new(PRIMARY_DOWN_LOG_INTERVAL),
            }),
            log,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Return the first node whose `/eth/v1/node/health` responds within the client's timeout;
    /// fall back to the primary (index 0) with a logged warning if none responds.
    pub async fn select_healthy(&self) -> &BeaconNodeHttpClient {
        for (i, client) in self.clients.iter().enumerate() {
            if client.get_node_health().await.is_ok() {
                self.note_selection(i, true);
                return client;
            }
            if i == 0 {
                let mut state = self.state.lock();
                if state.primary_down_throttle.should_log() {
                    warn!(self.log, "Primary beacon node down"; "node" => %client.server_url());
                }
            }
        }
        self.note_selection(0, false);
        &self.clients[0]
    }

    /// Whether any configured node currently answers its health check. Used by the REST surface
    /// to distinguish "no duties yet" from "can't reach any beacon node at all".
    pub async fn any_healthy(&self) -> bool {
        for client in &self.clients {
            if client.get_node_health().await.is_ok() {
                return true;
            }
        }
        false
    }

    fn note_selection(&self, index: usize, healthy: bool) {
        let mut state = self.state.lock();
        let changed = state.selected != index || state.healthy != healthy;
        state.selected = index;
        state.healthy = healthy;
        if changed || state.using_node_throttle.should_log() {
            let client = &self.clients[index];
            if healthy {
                debug!(self.log, "Using beacon node"; "node" => %client.server_url());
            } else {
                warn!(
                    self.log,
                    "No healthy beacon node; using primary anyway, data may be stale";
                    "node" => %client.server_url()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_allows_first_then_blocks() {
        let mut t = Throttle::new(Duration::from_secs(60));
        assert!(t.should_log());
        assert!(!t.should_log());
    }
}
