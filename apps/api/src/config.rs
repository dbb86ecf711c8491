use anyhow::{bail, Context, Result};

use crate::github_client::FileLocation;

pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_REPO: &str = "problem-bank/problems";
pub const DEFAULT_GITHUB_FILE_PATH: &str = "data/problems.json";
pub const DEFAULT_GITHUB_BRANCH: &str = "main";

/// Application configuration loaded from environment variables.
///
/// Credentials are optional at startup: a missing key surfaces as a
/// configuration error on the request that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub github_owner: String,
    pub github_repo: String,
    pub github_file_path: String,
    pub github_branch: String,
    pub port: u16,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        let (owner, repo) =
            split_repo_slug(DEFAULT_GITHUB_REPO).unwrap_or_default();
        Config {
            gemini_api_key: None,
            gemini_api_url: DEFAULT_GEMINI_API_URL.to_string(),
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_owner: owner,
            github_repo: repo,
            github_file_path: DEFAULT_GITHUB_FILE_PATH.to_string(),
            github_branch: DEFAULT_GITHUB_BRANCH.to_string(),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let slug = env_or("GITHUB_REPO", DEFAULT_GITHUB_REPO);
        let (github_owner, github_repo) = split_repo_slug(&slug)
            .with_context(|| format!("GITHUB_REPO must look like 'owner/repo', got '{slug}'"))?;

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_api_url: env_or("GEMINI_API_URL", &defaults.gemini_api_url),
            github_token: optional_env("GITHUB_TOKEN"),
            github_api_url: env_or("GITHUB_API_URL", &defaults.github_api_url),
            github_owner,
            github_repo,
            github_file_path: env_or("GITHUB_FILE_PATH", &defaults.github_file_path),
            github_branch: env_or("GITHUB_BRANCH", &defaults.github_branch),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", &defaults.rust_log),
        })
    }

    /// The remote file holding the problem collection.
    pub fn file_location(&self) -> FileLocation {
        FileLocation {
            owner: self.github_owner.clone(),
            repo: self.github_repo.clone(),
            path: self.github_file_path.clone(),
            branch: self.github_branch.clone(),
        }
    }
}

/// Blank values count as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn split_repo_slug(slug: &str) -> Result<(String, String)> {
    let slug = slug.trim().trim_matches('/');
    match slug.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("invalid repository slug '{slug}'"),
    }
}
