//! Background health probing of validator key-manager endpoints (spec.md §4.2). Each endpoint
//! carries its own bearer token; a node is healthy iff `/eth/v1/validator/.../feerecipient`
//! returns a JSON body with either `data` or `message`. The probe pubkey itself is irrelevant —
//! the health check only cares about the shape of the response, not whether that particular key
//! is actually managed — so a fixed placeholder BLS point is used for every endpoint.

use eth2::KeyManagerHttpClient;
use parking_lot::RwLock;
use reqwest::StatusCode;
use slog::{debug, warn, Logger};
use std::collections::HashSet;
use std::sync::Arc;

/// Not a real validator key; only the endpoint's response shape is inspected.
pub const FEERECIPIENT_PROBE_PUBKEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000000000000000000000000000000";

pub struct KeyManagerEndpoint {
    pub index: usize,
    pub client: KeyManagerHttpClient,
}

/// Published snapshot of which key-manager endpoints are currently healthy, by index into the
/// configured list.
pub struct KeyManagerPool {
    endpoints: Vec<KeyManagerEndpoint>,
    healthy: RwLock<Arc<HashSet<usize>>>,
    log: Logger,
}

impl KeyManagerPool {
    pub fn new(clients: Vec<KeyManagerHttpClient>, log: Logger) -> Self {
        let endpoints = clients
            .into_iter()
            .enumerate()
            .map(|(index, client)| KeyManagerEndpoint { index, client })
            .collect();
        Self {
            endpoints,
            healthy: RwLock::new(Arc::new(HashSet::new())),
            log,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn healthy_indices(&self) -> Arc<HashSet<usize>> {
        self.healthy.read().clone()
    }

    pub fn healthy_clients(&self) -> Vec<&KeyManagerHttpClient> {
        let healthy = self.healthy_indices();
        self.endpoints
            .iter()
            .filter(|e| healthy.contains(&e.index))
            .map(|e| &e.client)
            .collect()
    }

    /// Probe every endpoint once and republish the healthy set. Intended to be called on a
    /// timer by the lifecycle loop.
    pub async fn probe_all(&self) {
        let mut healthy = HashSet::new();
        for endpoint in &self.endpoints {
            match endpoint.client.healthcheck(FEERECIPIENT_PROBE_PUBKEY).await {
                Ok(()) => {
                    healthy.insert(endpoint.index);
                }
                Err(eth2::Error::StatusCode(status))
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
                {
                    warn!(self.log, "Key manager auth failed"; "endpoint_index" => endpoint.index);
                }
                Err(e) => {
                    debug!(self.log, "Key manager unhealthy"; "endpoint_index" => endpoint.index, "error" => %e);
                }
            }
        }
        *self.healthy.write() = Arc::new(healthy);
    }
}
