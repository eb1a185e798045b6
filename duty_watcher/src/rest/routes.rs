use super::RestState;
use crate::duties::DutyType;
use crate::identifiers::parser::{is_valid_index_or_pubkey, parse_many};
use crate::identifiers::resolve::resolve;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const RAW_TIMEOUT: Duration = Duration::from_secs(7);
const ANY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct Detail {
    detail: &'static str,
}

#[derive(Serialize)]
struct AnyResponse {
    any: bool,
}

#[derive(Serialize)]
struct MalformedResponse {
    identifiers: Vec<String>,
}

#[derive(Serialize)]
struct IdentifierView {
    index: u64,
    pubkey: String,
    alias: Option<String>,
}

fn with_state(
    state: RestState,
) -> impl Filter<Extract = (RestState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn routes(
    state: RestState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let raw = warp::path!("duties" / "raw" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(duties_raw);

    let any = warp::path!("duties" / "any")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(duties_any);

    let add = warp::path!("validator" / "identifier")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(add_identifiers);

    let remove = warp::path!("validator" / "identifier")
        .and(warp::delete())
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(remove_identifiers);

    raw.or(any)
        .unify()
        .or(add)
        .unify()
        .or(remove)
        .unify()
        .recover(handle_rejection)
}

fn duty_type_for(kind: &str) -> Option<DutyType> {
    match kind {
        "attestation" => Some(DutyType::Attestation),
        "sync-committee" => Some(DutyType::SyncCommittee),
        "proposing" => Some(DutyType::Proposing),
        _ => None,
    }
}

async fn duties_raw(kind: String, state: RestState) -> Result<Box<dyn Reply>, Rejection> {
    let duty_type = match duty_type_for(&kind) {
        Some(t) => t,
        None => return Ok(Box::new(StatusCode::NOT_FOUND)),
    };

    match tokio::time::timeout(RAW_TIMEOUT, state.beacon_pool.any_healthy()).await {
        Ok(true) => {
            let duties: Vec<_> = state
                .duty_store
                .of_type(duty_type)
                .iter()
                .map(|d| d.view(&state.clock))
                .collect();
            Ok(Box::new(warp::reply::json(&duties)))
        }
        _ => Ok(Box::new(warp::reply::with_status(
            warp::reply::json(&Detail {
                detail: "no beacon node connection",
            }),
            StatusCode::SERVICE_UNAVAILABLE,
        ))),
    }
}

async fn duties_any(state: RestState) -> Result<Box<dyn Reply>, Rejection> {
    match tokio::time::timeout(ANY_TIMEOUT, state.beacon_pool.any_healthy()).await {
        Ok(connected) => {
            let any = connected && !state.duty_store.get().is_empty();
            Ok(Box::new(warp::reply::json(&AnyResponse { any })))
        }
        Err(_) => Ok(Box::new(warp::reply::with_status(
            warp::reply::json(&Detail {
                detail: "no beacon node connection",
            }),
            StatusCode::SERVICE_UNAVAILABLE,
        ))),
    }
}

async fn add_identifiers(
    tokens: Vec<String>,
    state: RestState,
) -> Result<Box<dyn Reply>, Rejection> {
    let (parsed, _warnings) = parse_many(tokens.iter().map(|s| s.as_str()));
    if parsed.is_empty() && !tokens.is_empty() {
        return Ok(Box::new(warp::reply::with_status(
            warp::reply::json(&MalformedResponse { identifiers: tokens }),
            StatusCode::BAD_REQUEST,
        )));
    }

    let resolved = resolve(&parsed, &state.beacon_pool, &state.log).await;
    let added = state.registry.add(resolved);
    let view: Vec<_> = added
        .into_iter()
        .map(|v| IdentifierView {
            index: v.index,
            pubkey: v.pubkey,
            alias: v.alias,
        })
        .collect();
    Ok(Box::new(warp::reply::with_status(
        warp::reply::json(&view),
        StatusCode::CREATED,
    )))
}

async fn remove_identifiers(
    tokens: Vec<String>,
    state: RestState,
) -> Result<Box<dyn Reply>, Rejection> {
    let well_formed: Vec<String> = tokens
        .iter()
        .filter(|t| is_valid_index_or_pubkey(t))
        .cloned()
        .collect();
    if well_formed.is_empty() && !tokens.is_empty() {
        return Ok(Box::new(warp::reply::with_status(
            warp::reply::json(&MalformedResponse { identifiers: tokens }),
            StatusCode::BAD_REQUEST,
        )));
    }

    let removed = state.registry.remove(&well_formed);
    let view: Vec<_> = removed
        .into_iter()
        .map(|v| IdentifierView {
            index: v.index,
            pubkey: v.pubkey,
            alias: v.alias,
        })
        .collect();
    Ok(Box::new(warp::reply::json(&view)))
}

async fn handle_rejection(_err: Rejection) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::with_status(
        warp::reply::json(&Detail { detail: "not found" }),
        StatusCode::NOT_FOUND,
    ))
}
