use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CreateRepoRequest, Repository, SearchPage, UserSummary};

/// Remote code-hosting service. Every call either returns structured data or
/// fails with a remote error; callers never see transport details.
#[async_trait]
pub trait Forge: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// URL of a file inside the repository at its default branch.
    fn raw_url(&self, repo: &Repository, path: &str) -> String;

    async fn list_user_repos(&self, login: &str) -> Result<Vec<Repository>>;
    async fn search_users(&self, query: &str) -> Result<SearchPage<UserSummary>>;
    async fn search_repos(&self, query: &str) -> Result<SearchPage<Repository>>;
    async fn get_readme(&self, owner: &str, repo: &str) -> Result<String>;
    async fn create_repo(&self, token: &str, request: &CreateRepoRequest) -> Result<()>;
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Resolve an image reference from a README into a fetchable URL.
pub fn resolve_image_url(forge: &dyn Forge, repo: &Repository, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }
    let path = reference.trim_start_matches("./").trim_start_matches('/');
    forge.raw_url(repo, path)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::RemGitError;

    /// In-memory forge for controller and executor tests.
    #[derive(Debug, Default)]
    pub struct FakeForge {
        pub repos: Vec<Repository>,
        pub users: Vec<UserSummary>,
        pub readmes: HashMap<String, String>,
        pub images: HashMap<String, Vec<u8>>,
        pub created: Mutex<Vec<CreateRepoRequest>>,
    }

    #[async_trait]
    impl Forge for FakeForge {
        fn name(&self) -> &str {
            "fake"
        }

        fn raw_url(&self, repo: &Repository, path: &str) -> String {
            format!("fake://{}/{}", repo.full_name, path)
        }

        async fn list_user_repos(&self, login: &str) -> Result<Vec<Repository>> {
            Ok(self
                .repos
                .iter()
                .filter(|r| r.owner == login)
                .cloned()
                .collect())
        }

        async fn search_users(&self, query: &str) -> Result<SearchPage<UserSummary>> {
            let items: Vec<_> = self
                .users
                .iter()
                .filter(|u| u.login.contains(query))
                .cloned()
                .collect();
            Ok(SearchPage {
                total_count: items.len() as u64,
                items,
            })
        }

        async fn search_repos(&self, query: &str) -> Result<SearchPage<Repository>> {
            let items: Vec<_> = self
                .repos
                .iter()
                .filter(|r| r.full_name.contains(query))
                .cloned()
                .collect();
            Ok(SearchPage {
                total_count: items.len() as u64,
                items,
            })
        }

        async fn get_readme(&self, owner: &str, repo: &str) -> Result<String> {
            let key = format!("{}/{}", owner, repo);
            self.readmes
                .get(&key)
                .cloned()
                .ok_or(RemGitError::NotFound(key))
        }

        async fn create_repo(&self, _token: &str, request: &CreateRepoRequest) -> Result<()> {
            if let Ok(mut created) = self.created.lock() {
                created.push(request.clone());
            }
            Ok(())
        }

        async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.images
                .get(url)
                .cloned()
                .ok_or_else(|| RemGitError::NotFound(url.to_string()))
        }
    }
}
