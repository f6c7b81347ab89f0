use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository snapshot as shown in lists and the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub private: bool,
    pub html_url: String,
    pub clone_url: String,
    pub default_branch: String,
    pub topics: Vec<String>,
    pub stars: u32,
    pub forks: u32,
    pub open_issues: u32,
    pub watchers: u32,
    pub size_kb: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// GitHub user as returned by user search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub login: String,
    pub html_url: String,
}

/// A ranked page of search hits plus the server-side total
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> Default for SearchPage<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}

/// What a search query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    User,
    #[default]
    Repo,
}

impl SearchMode {
    pub fn toggle(self) -> Self {
        match self {
            SearchMode::User => SearchMode::Repo,
            SearchMode::Repo => SearchMode::User,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::User => write!(f, "Users"),
            SearchMode::Repo => write!(f, "Repositories"),
        }
    }
}

/// Body of a create-repository request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRepoRequest {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub has_issues: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
}

#[cfg(test)]
pub(crate) fn sample_repo(owner: &str, name: &str) -> Repository {
    let now = Utc::now();
    Repository {
        owner: owner.to_string(),
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        description: Some(format!("{} description", name)),
        language: Some("Rust".to_string()),
        private: false,
        html_url: format!("https://github.com/{}/{}", owner, name),
        clone_url: format!("https://github.com/{}/{}.git", owner, name),
        default_branch: "main".to_string(),
        topics: vec!["tui".to_string()],
        stars: 42,
        forks: 3,
        open_issues: 1,
        watchers: 42,
        size_kb: 128,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_mode_toggles() {
        assert_eq!(SearchMode::Repo.toggle(), SearchMode::User);
        assert_eq!(SearchMode::User.toggle(), SearchMode::Repo);
        assert_eq!(SearchMode::default(), SearchMode::Repo);
    }

    #[test]
    fn create_request_serializes_api_fields() {
        let req = CreateRepoRequest {
            name: "demo".to_string(),
            description: String::new(),
            private: true,
            has_issues: true,
            has_projects: false,
            has_wiki: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["name"], "demo");
        assert_eq!(json["private"], true);
        assert_eq!(json["has_projects"], false);
    }
}
