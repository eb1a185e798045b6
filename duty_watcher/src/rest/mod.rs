//! The optional operational REST surface (spec.md §4.8 "REST server"), built on `warp` like the
//! teacher's own HTTP-facing crates. Started only outside `cicd-*` modes; if the configured port
//! is already bound, the watcher logs it and carries on without a server rather than failing
//! the whole process.

mod routes;

pub use routes::routes;

use crate::duty_store::DutyStore;
use crate::identifiers::registry::IdentifierRegistry;
use crate::node_pool::BeaconNodePool;
use crate::slot_clock::SlotClock;
use slog::{error, info, Logger};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
pub struct RestState {
    pub duty_store: Arc<DutyStore>,
    pub registry: Arc<IdentifierRegistry>,
    pub beacon_pool: Arc<BeaconNodePool>,
    pub clock: SlotClock,
    pub log: Logger,
}

/// Attempt to bind and serve the REST API on `addr`. Returns immediately (the server runs in
/// the background) once the listener is bound; `Err` means the bind itself failed (most often
/// because the port is already in use), which the caller logs and otherwise ignores.
pub fn try_serve(addr: SocketAddr, state: RestState) -> Result<(), std::io::Error> {
    let log = state.log.clone();
    let filter = routes::routes(state);

    // `warp::serve(..).try_bind_ephemeral` surfaces a bind failure as `Err` instead of panicking,
    // which a plain `.run(addr)` would do on an address already in use.
    let (_addr, server) = warp::serve(filter)
        .try_bind_ephemeral(addr)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::AddrInUse, e.to_string()))?;

    tokio::spawn(async move {
        info!(log, "REST API listening"; "address" => %addr);
        server.await;
    });
    Ok(())
}

pub fn log_bind_failure(log: &Logger, addr: SocketAddr, err: &std::io::Error) {
    error!(
        log,
        "Could not bind REST API address, continuing without it";
        "address" => %addr,
        "error" => %err,
    );
}
