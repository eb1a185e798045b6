//! A minimal typed HTTP client for the subset of the consensus-layer standard API this crate
//! needs: genesis, validator status lookup, the three duty endpoints, and the node-health
//! check. One call = one HTTP request; chunking, retrying and node fallback are the caller's
//! concern ([`duty_watcher`]'s request layer wraps this client for that purpose).

pub mod types;

use reqwest::{Method, StatusCode};
use sensitive_url::SensitiveUrl;
use std::time::Duration;
pub use types::*;

#[derive(Debug)]
pub enum Error {
    Url(sensitive_url::SensitiveError),
    Reqwest(reqwest::Error),
    /// The response had a success status code but no usable body (no `data`, and, where
    /// accepted, no `message` either).
    NoData,
    StatusCode(StatusCode),
    /// `GET /eth/v1/remotekeys` returning 500: a known limitation of one validator client,
    /// which never implemented the remote-keys endpoint. Not retryable; callers should treat
    /// it as "this endpoint contributes no remote keys" rather than a transient failure.
    RemoteKeysUnsupported,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Url(e) => write!(f, "{e}"),
            Error::Reqwest(e) => write!(f, "{e}"),
            Error::NoData => write!(f, "response had no `data` field"),
            Error::StatusCode(s) => write!(f, "unexpected status code {s}"),
            Error::RemoteKeysUnsupported => {
                write!(f, "key manager does not implement GET /eth/v1/remotekeys")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Reqwest(e)
    }
}

#[derive(Clone)]
pub struct BeaconNodeHttpClient {
    client: reqwest::Client,
    server: SensitiveUrl,
}

impl BeaconNodeHttpClient {
    pub fn new(server: SensitiveUrl, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { client, server })
    }

    pub fn server_url(&self) -> &SensitiveUrl {
        &self.server
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, Error> {
        self.server.join(path).map_err(Error::Url)
    }

    /// `GET /eth/v1/node/health` — 200 means healthy; any other status (including a connection
    /// error) means not.
    pub async fn get_node_health(&self) -> Result<(), Error> {
        let url = self.url("/eth/v1/node/health")?;
        let resp = self.client.get(url).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::StatusCode(resp.status()))
        }
    }

    /// `GET /eth/v1/beacon/genesis`.
    pub async fn get_beacon_genesis(&self) -> Result<GenesisData, Error> {
        let url = self.url("/eth/v1/beacon/genesis")?;
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body: GenericResponse<GenesisData> = resp.json().await?;
        Ok(body.data)
    }

    /// `GET /eth/v1/beacon/states/head/validators?id=v1,v2,...`.
    pub async fn get_beacon_states_head_validators(
        &self,
        ids: &[String],
    ) -> Result<Vec<ValidatorData>, Error> {
        let url = self.url("/eth/v1/beacon/states/head/validators")?;
        let resp = self
            .client
            .get(url)
            .query(&[("id", ids.join(","))])
            .send()
            .await?
            .error_for_status()?;
        let body: GenericResponse<Vec<ValidatorData>> = resp.json().await?;
        Ok(body.data)
    }

    /// `POST /eth/v1/validator/duties/attester/{epoch}`. The standard API takes validator
    /// indices as a JSON array of decimal *strings*, not numbers — see `quoted_u64_vec` in
    /// `types.rs`.
    pub async fn post_validator_duties_attester(
        &self,
        epoch: u64,
        indices: &[u64],
    ) -> Result<Vec<AttesterData>, Error> {
        let url = self.url(&format!("/eth/v1/validator/duties/attester/{epoch}"))?;
        let body: Vec<String> = indices.iter().map(u64::to_string).collect();
        let resp = self
            .client
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let body: GenericResponse<Vec<AttesterData>> = resp.json().await?;
        Ok(body.data)
    }

    /// `GET /eth/v1/validator/duties/proposer/{epoch}`.
    pub async fn get_validator_duties_proposer(
        &self,
        epoch: u64,
    ) -> Result<Vec<ProposerData>, Error> {
        let url = self.url(&format!("/eth/v1/validator/duties/proposer/{epoch}"))?;
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body: GenericResponse<Vec<ProposerData>> = resp.json().await?;
        Ok(body.data)
    }

    /// `POST /eth/v1/validator/duties/sync/{epoch}`. Same quoted-string index convention as
    /// `post_validator_duties_attester`.
    pub async fn post_validator_duties_sync(
        &self,
        epoch: u64,
        indices: &[u64],
    ) -> Result<Vec<SyncDuty>, Error> {
        let url = self.url(&format!("/eth/v1/validator/duties/sync/{epoch}"))?;
        let body: Vec<String> = indices.iter().map(u64::to_string).collect();
        let resp = self
            .client
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let body: GenericResponse<Vec<SyncDuty>> = resp.json().await?;
        Ok(body.data)
    }
}

/// A validator key-manager endpoint: `GET /eth/v1/keystores` / `/eth/v1/remotekeys`, and a
/// feerecipient read used purely as a health check. Bearer-authenticated.
#[derive(Clone)]
pub struct KeyManagerHttpClient {
    client: reqwest::Client,
    server: SensitiveUrl,
    bearer_token: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct KeystoreEntry {
    pub validating_pubkey: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RemoteKeyEntry {
    pub pubkey: String,
}

impl KeyManagerHttpClient {
    pub fn new(server: SensitiveUrl, bearer_token: String, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self {
            client,
            server,
            bearer_token,
        })
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, Error> {
        self.server.join(path).map_err(Error::Url)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.bearer_token)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
    }

    pub async fn get_keystores(&self) -> Result<Vec<KeystoreEntry>, Error> {
        let url = self.url("/eth/v1/keystores")?;
        let resp = self
            .authed(self.client.get(url))
            .send()
            .await?
            .error_for_status()?;
        let body: GenericResponse<Vec<KeystoreEntry>> = resp.json().await?;
        Ok(body.data)
    }

    pub async fn get_remotekeys(&self) -> Result<Vec<RemoteKeyEntry>, Error> {
        let url = self.url("/eth/v1/remotekeys")?;
        let resp = self.authed(self.client.get(url)).send().await?;
        if resp.status() == StatusCode::INTERNAL_SERVER_ERROR {
            return Err(Error::RemoteKeysUnsupported);
        }
        let resp = resp.error_for_status()?;
        let body: GenericResponse<Vec<RemoteKeyEntry>> = resp.json().await?;
        Ok(body.data)
    }

    /// `GET /eth/v1/validator/<fixed-known-pubkey>/feerecipient`, used only to probe health: a
    /// healthy key manager returns a JSON body containing either `data` or `message`; 401/403 is
    /// an auth failure; anything else (including connection errors) is unhealthy.
    pub async fn healthcheck(&self, probe_pubkey: &str) -> Result<(), Error> {
        let url = self.url(&format!("/eth/v1/validator/{probe_pubkey}/feerecipient"))?;
        let resp = self.authed(self.client.get(url)).send().await?;
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::StatusCode(resp.status()))
            }
            status if status.is_success() || status.is_client_error() => {
                let body: serde_json::Value = resp.json().await?;
                if body.get("data").is_some() || body.get("message").is_some() {
                    Ok(())
                } else {
                    Err(Error::NoData)
                }
            }
            status => Err(Error::StatusCode(status)),
        }
    }
}
