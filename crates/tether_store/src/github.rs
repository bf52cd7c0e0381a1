//! GitHub contents-API credential store.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use tether_core::sink::{CredentialSink, SinkError};
use tether_core::AccountId;

use crate::config::{RepoTarget, StoreConfig};
use crate::error::StoreError;

const API_ROOT: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Durable blob store backed by the GitHub contents API.
///
/// Blobs live under `sessions/<account>/` in the configured repository.
/// Updates reference the probed blob `sha`, so a conflicting write is
/// rejected by the API instead of silently clobbered.
#[derive(Debug, Clone)]
pub struct GithubStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl GithubStore {
    pub fn new(config: StoreConfig) -> Self {
        GithubStore {
            client: store_client(),
            config,
        }
    }

    pub fn from_env() -> Self {
        GithubStore::new(StoreConfig::from_env())
    }

    fn contents_url(target: &RepoTarget, path: &str) -> String {
        format!(
            "{API_ROOT}/repos/{}/{}/contents/{}",
            target.owner, target.repo, path
        )
    }
}

/// HTTP client used for every store call; request and connect timeouts
/// keep a stuck remote from wedging an upload task.
fn store_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("tether/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap() // panics for the same reasons Client::new() would
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
}

#[async_trait]
impl CredentialSink for GithubStore {
    async fn probe(&self, path: &str) -> Result<Option<String>, SinkError> {
        let (token, target) = self.config.resolve().map_err(SinkError::from)?;
        let url = GithubStore::contents_url(&target, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|source| {
                SinkError::from(StoreError::Http {
                    path: path.to_string(),
                    source,
                })
            })?;

        match response.status() {
            StatusCode::OK => {
                let contents: ContentsResponse = response.json().await.map_err(|source| {
                    SinkError::from(StoreError::Http {
                        path: path.to_string(),
                        source,
                    })
                })?;
                Ok(Some(contents.sha))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::UnexpectedStatus {
                    path: path.to_string(),
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
        }
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        revision: Option<&str>,
    ) -> Result<(), SinkError> {
        let (token, target) = self.config.resolve().map_err(SinkError::from)?;
        let url = GithubStore::contents_url(&target, path);

        let mut payload = json!({
            "message": format!("update {path}"),
            "content": BASE64.encode(bytes),
        });
        if let Some(revision) = revision {
            payload["sha"] = json!(revision);
        }

        let response = self
            .client
            .put(&url)
            .bearer_auth(&token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|source| {
                SinkError::from(StoreError::Http {
                    path: path.to_string(),
                    source,
                })
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(path, updated = revision.is_some(), "stored credential blob");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::UnexpectedStatus {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            }
            .into())
        }
    }

    fn artifact_location(&self, account: &AccountId) -> Result<String, SinkError> {
        let (_, target) = self.config.resolve().map_err(SinkError::from)?;
        Ok(format!(
            "{}/{}/sessions/{}",
            target.owner, target.repo, account
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn configured() -> GithubStore {
        GithubStore::new(StoreConfig {
            token: Some("ghp_test".to_string()),
            repository: Some("orual/tether-sessions".to_string()),
        })
    }

    #[test]
    fn contents_urls_hit_the_repo_path() {
        let target = RepoTarget::parse("orual/tether-sessions").expect("parse");
        assert_eq!(
            GithubStore::contents_url(&target, "sessions/2348140825959/creds.json"),
            "https://api.github.com/repos/orual/tether-sessions/contents/sessions/2348140825959/creds.json"
        );
    }

    #[test]
    fn artifact_location_is_rederivable_from_the_account() {
        let store = configured();
        let account = AccountId::parse("2348140825959").expect("valid account");
        assert_eq!(
            store.artifact_location(&account).expect("location"),
            "orual/tether-sessions/sessions/2348140825959"
        );
    }

    #[tokio::test]
    async fn missing_configuration_fails_fast() {
        let store = GithubStore::new(StoreConfig::default());
        let account = AccountId::parse("2348140825959").expect("valid account");

        assert!(matches!(
            store.artifact_location(&account),
            Err(SinkError::Configuration { .. })
        ));
        assert!(matches!(
            store.probe("sessions/2348140825959/creds.json").await,
            Err(SinkError::Configuration { .. })
        ));
        assert!(matches!(
            store
                .put("sessions/2348140825959/creds.json", b"{}", None)
                .await,
            Err(SinkError::Configuration { .. })
        ));
    }
}
