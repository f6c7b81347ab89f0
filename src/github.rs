use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::Deserialize;

use crate::error::{RemGitError, Result};
use crate::forge::Forge;
use crate::types::{CreateRepoRequest, Repository, SearchPage, UserSummary};

const API: &str = "https://api.github.com";
const PER_PAGE: u32 = 30;
const IMAGE_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_IMAGE_BYTES: u64 = 8 * 1024 * 1024;

/// Hosts that get the token; third-party image hosts never see it.
fn is_github_host(url: &str) -> bool {
    ["https://raw.githubusercontent.com/", "https://github.com/", "https://api.github.com/"]
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

fn ensure_within_limit(url: &str, size: u64) -> Result<()> {
    if size > MAX_IMAGE_BYTES {
        return Err(RemGitError::Decode(format!(
            "{} is larger than {} bytes",
            url, MAX_IMAGE_BYTES
        )));
    }
    Ok(())
}

pub struct GitHub {
    client: Octocrab,
    http: reqwest::Client,
    token: Option<String>,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub").finish_non_exhaustive()
    }
}

impl From<octocrab::Error> for RemGitError {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. } => {
                RemGitError::from_status(source.status_code.as_u16(), &source.message)
            }
            _ => RemGitError::Network(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoPayload {
    name: String,
    full_name: String,
    owner: OwnerPayload,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    clone_url: String,
    default_branch: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    stargazers_count: u32,
    #[serde(default)]
    forks_count: u32,
    #[serde(default)]
    open_issues_count: u32,
    #[serde(default)]
    watchers_count: u32,
    #[serde(default)]
    size: u64,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<RepoPayload> for Repository {
    fn from(repo: RepoPayload) -> Self {
        Repository {
            owner: repo.owner.login,
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description.filter(|d| !d.is_empty()),
            language: repo.language,
            private: repo.private,
            html_url: repo.html_url,
            clone_url: repo.clone_url,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
            topics: repo.topics,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            watchers: repo.watchers_count,
            size_kb: repo.size,
            created_at: repo.created_at.unwrap_or_else(Utc::now),
            updated_at: repo.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload<T> {
    #[serde(default)]
    total_count: u64,
    items: Vec<T>,
}

impl GitHub {
    pub fn new(token: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = &token {
            builder = builder.personal_token(token.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RemGitError::Auth(e.to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent("remgit")
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| RemGitError::Network(e.to_string()))?;

        Ok(Self {
            client,
            http,
            token,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl Forge for GitHub {
    fn name(&self) -> &str {
        "GitHub"
    }

    fn raw_url(&self, repo: &Repository, path: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            repo.owner, repo.name, repo.default_branch, path
        )
    }

    async fn list_user_repos(&self, login: &str) -> Result<Vec<Repository>> {
        let route = format!(
            "/users/{}/repos?sort=updated&per_page=100",
            urlencoding::encode(login)
        );
        let repos: Vec<RepoPayload> = self.client.get(route, None::<&()>).await?;
        Ok(repos.into_iter().map(Repository::from).collect())
    }

    async fn search_users(&self, query: &str) -> Result<SearchPage<UserSummary>> {
        let route = format!(
            "/search/users?q={}&sort=followers&order=desc&per_page={}",
            urlencoding::encode(query),
            PER_PAGE
        );
        let results: SearchPayload<UserPayload> = self.client.get(route, None::<&()>).await?;

        Ok(SearchPage {
            total_count: results.total_count,
            items: results
                .items
                .into_iter()
                .map(|u| UserSummary {
                    login: u.login,
                    html_url: u.html_url,
                })
                .collect(),
        })
    }

    async fn search_repos(&self, query: &str) -> Result<SearchPage<Repository>> {
        let route = format!(
            "/search/repositories?q={}&sort=stars&order=desc&per_page={}",
            urlencoding::encode(query),
            PER_PAGE
        );
        let results: SearchPayload<RepoPayload> = self.client.get(route, None::<&()>).await?;

        Ok(SearchPage {
            total_count: results.total_count,
            items: results.items.into_iter().map(Repository::from).collect(),
        })
    }

    async fn get_readme(&self, owner: &str, repo: &str) -> Result<String> {
        let url = format!("{}/repos/{}/{}/readme", API, owner, repo);
        let response = self
            .authorized(self.http.get(&url))
            .header("Accept", "application/vnd.github.raw")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemGitError::from_status(
                response.status().as_u16(),
                &format!("README for {}/{}", owner, repo),
            ));
        }

        Ok(response.text().await?)
    }

    async fn create_repo(&self, token: &str, request: &CreateRepoRequest) -> Result<()> {
        let url = format!("{}/user/repos", API);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            tracing::error!(status, body = %text, "create repository failed");
            return Err(match status {
                401 => RemGitError::Auth("token rejected".to_string()),
                422 => RemGitError::Api(format!("Create failed: {}", text)),
                _ => RemGitError::from_status(status, "create repository"),
            });
        }
        Ok(())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = self.http.get(url).timeout(IMAGE_TIMEOUT);
        if is_github_host(url) {
            request = self.authorized(request);
        }
        let mut response = request.send().await?;

        if !response.status().is_success() {
            return Err(RemGitError::from_status(response.status().as_u16(), url));
        }
        if let Some(len) = response.content_length() {
            ensure_within_limit(url, len)?;
        }

        // Content-Length can be absent or wrong, so count while reading
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            ensure_within_limit(url, bytes.len() as u64)?;
        }
        Ok(bytes)
    }
}
