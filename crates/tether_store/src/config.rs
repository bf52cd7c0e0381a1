//! Store configuration from the environment.
//!
//! Raw values are captured once at process start; parsing is deferred to
//! first use so a misconfigured store surfaces as an upload-time
//! configuration error rather than a startup crash.

use crate::error::{StoreError, StoreResult};

pub const TOKEN_ENV: &str = "TETHER_GITHUB_TOKEN";
pub const REPO_ENV: &str = "TETHER_GITHUB_REPO";

/// Raw store settings as found in the environment.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub token: Option<String>,
    pub repository: Option<String>,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        StoreConfig {
            token: std::env::var(TOKEN_ENV).ok().filter(|v| !v.is_empty()),
            repository: std::env::var(REPO_ENV).ok().filter(|v| !v.is_empty()),
        }
    }

    /// Whether any store configuration was supplied at all. Used by the
    /// server to decide between the GitHub sink and a local fallback.
    pub fn is_present(&self) -> bool {
        self.token.is_some() || self.repository.is_some()
    }

    /// Parse the raw values. Errors here are the configuration failures
    /// that abort an upload sequence before any file is attempted.
    pub fn resolve(&self) -> StoreResult<(String, RepoTarget)> {
        let token = self.token.clone().ok_or_else(|| missing(TOKEN_ENV))?;
        let raw = self.repository.clone().ok_or_else(|| missing(REPO_ENV))?;
        let target = RepoTarget::parse(&raw)?;
        Ok((token, target))
    }
}

fn missing(var: &str) -> StoreError {
    StoreError::Configuration {
        reason: format!("{var} is not set"),
    }
}

/// Target repository in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
}

impl RepoTarget {
    /// Accepts `owner/repo` or a full `https://github.com/owner/repo[.git]`
    /// URL.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        let rest = trimmed
            .strip_prefix("https://github.com/")
            .or_else(|| trimmed.strip_prefix("http://github.com/"))
            .or_else(|| trimmed.strip_prefix("github.com/"))
            .unwrap_or(trimmed);
        let rest = rest.strip_suffix(".git").unwrap_or(rest);

        let mut parts = rest.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                Ok(RepoTarget {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(StoreError::Configuration {
                reason: format!("cannot parse target repository from '{raw}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_owner_slash_repo() {
        let target = RepoTarget::parse("orual/tether-sessions").expect("parse");
        assert_eq!(target.owner, "orual");
        assert_eq!(target.repo, "tether-sessions");
    }

    #[test]
    fn parses_full_urls() {
        for raw in [
            "https://github.com/orual/tether-sessions",
            "https://github.com/orual/tether-sessions.git",
            "https://github.com/orual/tether-sessions/",
            "github.com/orual/tether-sessions",
        ] {
            let target = RepoTarget::parse(raw).expect("parse");
            assert_eq!(target.owner, "orual");
            assert_eq!(target.repo, "tether-sessions", "input: {raw}");
        }
    }

    #[test]
    fn rejects_unparsable_targets() {
        for raw in ["", "justowner", "a/b/c", "https://github.com/onlyowner"] {
            assert!(RepoTarget::parse(raw).is_err(), "should reject: {raw}");
        }
    }

    #[test]
    fn resolve_requires_both_values() {
        let config = StoreConfig {
            token: Some("ghp_test".to_string()),
            repository: None,
        };
        assert!(config.resolve().is_err());
        assert!(config.is_present());

        let config = StoreConfig {
            token: Some("ghp_test".to_string()),
            repository: Some("orual/tether-sessions".to_string()),
        };
        assert!(config.resolve().is_ok());
    }
}
