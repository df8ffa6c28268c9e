use async_trait::async_trait;
use reqwest::header::{ACCEPT, LINK};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::discovery::Repository;
use crate::error::{ConfigError, ListError};

/// Public GitHub REST endpoint.
pub const DEFAULT_API: &str = "https://api.github.com";

/// Largest page the repository listing endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 100;

const USER_AGENT: &str = concat!("ghbackup/", env!("CARGO_PKG_VERSION"));

/// HTTP Basic credentials attached to every API request.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &crate::mask::REDACTED)
            .finish()
    }
}

/// A GET request against the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub basic_auth: Option<BasicAuth>,
}

/// The parts of a response the client looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    /// Raw `Link` header, if any.
    pub link: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Transport boundary for all API I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("cannot create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(auth) = &request.basic_auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?
            .to_vec();

        Ok(ApiResponse { status, link, body })
    }
}

/// Whether an account is a user or an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCategory {
    User,
    Organization,
}

impl AccountCategory {
    /// Path segment of the listing endpoint: `users` or `orgs`.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Organization => "orgs",
        }
    }
}

/// Which repository set is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingScope {
    /// `{users|orgs}/{account}/repos`, category looked up first.
    #[default]
    Account,
    /// `user/repos`: everything the token can see.
    Authenticated,
}

impl FromStr for ListingScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "account" => Ok(Self::Account),
            "authenticated" => Ok(Self::Authenticated),
            other => Err(format!(
                "unknown scope `{other}` (expected `account` or `authenticated`)"
            )),
        }
    }
}

/// What to list, frozen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub scope: ListingScope,
    pub account: Option<String>,
    /// In the authenticated scope, keep only repositories owned by `account`.
    pub owner_filter: bool,
    /// Append `type=owner` to the listing URL.
    pub owned_only: bool,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    #[serde(rename = "type")]
    kind: String,
}

/// Repository entry as returned by the API. Field names differ between
/// endpoints and API versions, so everything is optional.
#[derive(Debug, Deserialize)]
struct RawRepository {
    full_name: Option<String>,
    name: Option<String>,
    clone_url: Option<String>,
    git_url: Option<String>,
    ssh_url: Option<String>,
    private: Option<bool>,
}

impl RawRepository {
    fn into_repository(self, account: Option<&str>) -> Result<Repository, ListError> {
        let path = match (self.full_name, self.name.as_deref(), account) {
            (Some(full_name), _, _) => full_name,
            (None, Some(name), Some(account)) => format!("{account}/{name}"),
            (None, name, _) => {
                return Err(ListError::InvalidRepository {
                    path: name.unwrap_or_default().to_string(),
                    reason: "no full_name in response".to_string(),
                })
            }
        };

        let clone_url = self
            .clone_url
            .or(self.git_url)
            .or(self.ssh_url)
            .ok_or_else(|| ListError::InvalidRepository {
                path: path.clone(),
                reason: "no clone URL in response".to_string(),
            })?;

        Repository::new(path, clone_url, self.private.unwrap_or(false))
    }
}

/// GitHub REST client: account classification and repository listing.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_base: Url,
    auth: Option<BasicAuth>,
}

impl GitHubClient {
    /// Client for `api_base`. With a secret, every request carries
    /// `account:secret` basic authentication.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_base: Url,
        account: Option<&str>,
        secret: Option<&str>,
    ) -> Self {
        let auth = secret.filter(|s| !s.is_empty()).map(|secret| BasicAuth {
            username: account.unwrap_or_default().to_string(),
            password: secret.to_string(),
        });
        Self {
            transport,
            api_base,
            auth,
        }
    }

    /// Look up whether `account` is a user or an organization.
    ///
    /// One request, never retried.
    pub async fn classify(&self, account: &str) -> Result<AccountCategory, ListError> {
        let url = self.endpoint(&["users", account])?;
        let lookup = |source: ListError| ListError::Lookup {
            account: account.to_string(),
            source: Box::new(source),
        };

        let response = self.get(url.as_str()).await.map_err(lookup)?;
        let info: AccountInfo = serde_json::from_slice(&response.body)
            .map_err(|source| {
                lookup(ListError::Decode {
                    url: url.to_string(),
                    source,
                })
            })?;

        match info.kind.as_str() {
            "User" => Ok(AccountCategory::User),
            "Organization" => Ok(AccountCategory::Organization),
            _ => Err(ListError::UnknownCategory {
                kind: info.kind,
                account: account.to_string(),
            }),
        }
    }

    /// URL of the first listing page for `request`.
    pub async fn listing_url(&self, request: &ListingRequest) -> Result<Url, ListError> {
        let mut url = match (request.scope, request.account.as_deref()) {
            (ListingScope::Account, Some(account)) => {
                let category = self.classify(account).await?;
                debug!("Account {} is a {:?}", account, category);
                self.endpoint(&[category.path_segment(), account, "repos"])?
            }
            (ListingScope::Account, None) => {
                return Err(ListError::InvalidUrl {
                    url: self.api_base.to_string(),
                    reason: "the account scope needs an account name".to_string(),
                })
            }
            (ListingScope::Authenticated, _) => self.endpoint(&["user", "repos"])?,
        };

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("per_page", &MAX_PAGE_SIZE.to_string());
            if request.owned_only {
                query.append_pair("type", "owner");
            }
        }
        Ok(url)
    }

    /// Fetch every repository page by page, following `Link: rel="next"`.
    ///
    /// Any failing page aborts the whole listing. A path already seen on an
    /// earlier page is not added twice.
    pub async fn list_repositories(
        &self,
        request: &ListingRequest,
    ) -> Result<Vec<Repository>, ListError> {
        let owner_filter = match (request.scope, request.owner_filter) {
            (ListingScope::Authenticated, true) => request.account.as_deref(),
            _ => None,
        };

        let mut repositories = Vec::new();
        let mut seen_paths = HashSet::new();
        let mut visited_pages = HashSet::new();
        let mut next_url = Some(self.listing_url(request).await?.to_string());
        let mut page = 0usize;

        while let Some(url) = next_url.take() {
            if !visited_pages.insert(url.clone()) {
                warn!("Pagination loops back to {}, stopping", url);
                break;
            }
            page += 1;

            let response = self.get(&url).await?;
            let entries: Vec<RawRepository> =
                serde_json::from_slice(&response.body).map_err(|source| ListError::Decode {
                    url: url.clone(),
                    source,
                })?;
            debug!("Page {} from {}: {} entries", page, url, entries.len());

            for entry in entries {
                let repository = entry.into_repository(request.account.as_deref())?;
                if let Some(owner) = owner_filter {
                    // GitHub logins are case-insensitive.
                    if !repository.owner().eq_ignore_ascii_case(owner) {
                        continue;
                    }
                }
                if seen_paths.insert(repository.path().to_string()) {
                    repositories.push(repository);
                } else {
                    debug!("Skipping duplicate entry {}", repository.path());
                }
            }

            next_url = response.link.as_deref().and_then(next_page_url);
        }

        info!(
            "Listed {} repositories from {} page(s)",
            repositories.len(),
            page
        );
        Ok(repositories)
    }

    async fn get(&self, url: &str) -> Result<ApiResponse, ListError> {
        debug!("GET {}", url);
        let response = self
            .transport
            .get(ApiRequest {
                url: url.to_string(),
                basic_auth: self.auth.clone(),
            })
            .await
            .map_err(|e| ListError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(ListError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ListError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ListError::InvalidUrl {
                url: self.api_base.to_string(),
                reason: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// URL of the next page from a `Link` header.
///
/// Only the first comma-separated entry is considered, and only when it is
/// marked `rel="next"`.
pub fn next_page_url(link: &str) -> Option<String> {
    let first = link.split(',').next()?;
    if !first.contains("rel=\"next\"") {
        return None;
    }
    let target = first.split(';').next()?.trim();
    let url = target.strip_prefix('<')?.strip_suffix('>')?;
    (!url.is_empty()).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use quickcheck_macros::quickcheck;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo_json(owner: &str, name: &str, private: bool) -> serde_json::Value {
        json!({
            "name": name,
            "full_name": format!("{owner}/{name}"),
            "clone_url": format!("https://github.com/{owner}/{name}.git"),
            "private": private,
        })
    }

    fn client_for(server: &MockServer, account: Option<&str>, secret: Option<&str>) -> GitHubClient {
        GitHubClient::new(
            Arc::new(ReqwestTransport::new().unwrap()),
            Url::parse(&server.uri()).unwrap(),
            account,
            secret,
        )
    }

    fn account_request(account: &str) -> ListingRequest {
        ListingRequest {
            scope: ListingScope::Account,
            account: Some(account.to_string()),
            owner_filter: false,
            owned_only: false,
        }
    }

    #[test]
    fn test_next_page_url() {
        let link = r#"<https://api.github.com/user/repos?page=2>; rel="next", <https://api.github.com/user/repos?page=5>; rel="last""#;
        assert_eq!(
            next_page_url(link).as_deref(),
            Some("https://api.github.com/user/repos?page=2")
        );
    }

    #[test]
    fn test_next_page_only_first_entry_counts() {
        let link = r#"<https://api.github.com/user/repos?page=1>; rel="prev", <https://api.github.com/user/repos?page=3>; rel="next""#;
        assert_eq!(next_page_url(link), None);
        assert_eq!(next_page_url(""), None);
        assert_eq!(next_page_url(r#"<>; rel="next""#), None);
        assert_eq!(next_page_url(r#"https://x; rel="next""#), None);
    }

    #[quickcheck]
    fn prop_next_page_roundtrip(page: u32) -> bool {
        let url = format!("https://api.github.com/user/repos?per_page=100&page={page}");
        let link = format!(r#"<{url}>; rel="next", <https://api.github.com/x>; rel="last""#);
        next_page_url(&link) == Some(url)
    }

    #[test]
    fn test_listing_scope_from_str() {
        assert_eq!("account".parse::<ListingScope>(), Ok(ListingScope::Account));
        assert_eq!(
            "Authenticated".parse::<ListingScope>(),
            Ok(ListingScope::Authenticated)
        );
        assert!("everything".parse::<ListingScope>().is_err());
    }

    #[test]
    fn test_basic_auth_debug_hides_password() {
        let auth = BasicAuth {
            username: "octo".to_string(),
            password: "ghp_hidden".to_string(),
        };
        assert!(!format!("{:?}", auth).contains("ghp_hidden"));
    }

    #[tokio::test]
    async fn test_classify_user_and_org() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "User"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/github"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"type": "Organization"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        assert_eq!(client.classify("octocat").await.unwrap(), AccountCategory::User);
        assert_eq!(
            client.classify("github").await.unwrap(),
            AccountCategory::Organization
        );
    }

    #[tokio::test]
    async fn test_classify_failures() {
        let server = MockServer::start().await;
        Mock::given(path("/users/bot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "Bot"})))
            .mount(&server)
            .await;
        Mock::given(path("/users/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        Mock::given(path("/users/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        assert_matches!(
            client.classify("bot").await,
            Err(ListError::UnknownCategory { kind, .. }) if kind == "Bot"
        );
        assert_matches!(
            client.classify("garbled").await,
            Err(ListError::Lookup { source, .. }) if matches!(*source, ListError::Decode { .. })
        );
        assert_matches!(
            client.classify("ghost").await,
            Err(ListError::Lookup { source, .. }) if matches!(*source, ListError::Status { status: 404, .. })
        );
    }

    #[tokio::test]
    async fn test_list_follows_link_pages() {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(path("/users/octo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "User"})))
            .mount(&server)
            .await;
        Mock::given(path("/users/octo/repos"))
            .and(query_param("per_page", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([repo_json("octo", "a", false), repo_json("octo", "b", true)]))
                    .insert_header(
                        "Link",
                        format!(r#"<{uri}/pages/2>; rel="next", <{uri}/pages/3>; rel="last""#)
                            .as_str(),
                    ),
            )
            .mount(&server)
            .await;
        Mock::given(path("/pages/2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([repo_json("octo", "c", false)]))
                    .insert_header(
                        "Link",
                        format!(r#"<{uri}/pages/3>; rel="next", <{uri}/users/octo/repos>; rel="first""#)
                            .as_str(),
                    ),
            )
            .mount(&server)
            .await;
        Mock::given(path("/pages/3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([repo_json("octo", "d", false), repo_json("octo", "a", false)]))
                    .insert_header(
                        "Link",
                        format!(r#"<{uri}/users/octo/repos>; rel="first""#).as_str(),
                    ),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("octo"), None);
        let repos = client.list_repositories(&account_request("octo")).await.unwrap();

        let paths: Vec<&str> = repos.iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["octo/a", "octo/b", "octo/c", "octo/d"]);
        assert!(repos[1].is_private());
        assert_eq!(repos[2].clone_url(), "https://github.com/octo/c.git");
    }

    #[tokio::test]
    async fn test_list_sends_basic_auth_and_owner_query() {
        let server = MockServer::start().await;
        Mock::given(path("/users/octo"))
            .and(header("authorization", "Basic b2N0bzp0b2tlbg=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "Organization"})))
            .mount(&server)
            .await;
        Mock::given(path("/orgs/octo/repos"))
            .and(header("authorization", "Basic b2N0bzp0b2tlbg=="))
            .and(query_param("per_page", "100"))
            .and(query_param("type", "owner"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo_json("octo", "x", true)])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("octo"), Some("token"));
        let request = ListingRequest {
            owned_only: true,
            ..account_request("octo")
        };
        let repos = client.list_repositories(&request).await.unwrap();
        assert_eq!(repos.len(), 1);
    }

    #[tokio::test]
    async fn test_authenticated_scope_with_owner_filter() {
        let server = MockServer::start().await;
        Mock::given(path("/user/repos"))
            .and(header("authorization", "Basic b2N0bzp0b2tlbg=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                repo_json("octo", "mine", false),
                repo_json("some-org", "theirs", false),
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("octo"), Some("token"));
        let mut request = ListingRequest {
            scope: ListingScope::Authenticated,
            account: Some("octo".to_string()),
            owner_filter: true,
            owned_only: false,
        };
        let filtered = client.list_repositories(&request).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].path(), "octo/mine");

        request.owner_filter = false;
        assert_eq!(client.list_repositories(&request).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_owner_filter_ignores_case() {
        let server = MockServer::start().await;
        Mock::given(path("/user/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                repo_json("Octo", "mine", false),
                repo_json("octo", "other", true),
                repo_json("octopus", "theirs", false),
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("OCTO"), Some("token"));
        let request = ListingRequest {
            scope: ListingScope::Authenticated,
            account: Some("OCTO".to_string()),
            owner_filter: true,
            owned_only: false,
        };
        let paths: Vec<String> = client
            .list_repositories(&request)
            .await
            .unwrap()
            .iter()
            .map(|repository| repository.path().to_string())
            .collect();
        assert_eq!(paths, vec!["Octo/mine", "octo/other"]);
    }

    #[tokio::test]
    async fn test_failing_page_aborts_listing() {
        let server = MockServer::start().await;
        let uri = server.uri();
        Mock::given(path("/user/repos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([repo_json("octo", "a", false)]))
                    .insert_header("Link", format!(r#"<{uri}/pages/2>; rel="next""#).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(path("/pages/2"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client_for(&server, None, Some("token"));
        let request = ListingRequest {
            scope: ListingScope::Authenticated,
            account: None,
            owner_filter: false,
            owned_only: false,
        };
        assert_matches!(
            client.list_repositories(&request).await,
            Err(ListError::Status { status: 502, .. })
        );
    }

    #[tokio::test]
    async fn test_invalid_repository_path_rejected() {
        let server = MockServer::start().await;
        Mock::given(path("/user/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "full_name": "octo/..",
                "clone_url": "https://github.com/octo/evil.git",
            }])))
            .mount(&server)
            .await;

        let client = client_for(&server, None, Some("token"));
        let request = ListingRequest {
            scope: ListingScope::Authenticated,
            account: None,
            owner_filter: false,
            owned_only: false,
        };
        assert_matches!(
            client.list_repositories(&request).await,
            Err(ListError::InvalidRepository { .. })
        );
    }

    /// Serves `pages` canned pages chained through `Link` headers.
    struct PagedTransport {
        pages: HashMap<String, (Vec<serde_json::Value>, Option<String>)>,
        requests: Mutex<usize>,
    }

    #[async_trait]
    impl HttpTransport for PagedTransport {
        async fn get(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            *self.requests.lock().unwrap() += 1;
            let key = request.url.split('?').next().unwrap_or_default().to_string();
            match self.pages.get(&key) {
                Some((items, link)) => Ok(ApiResponse {
                    status: 200,
                    link: link.clone(),
                    body: serde_json::to_vec(items).unwrap(),
                }),
                None => Ok(ApiResponse {
                    status: 404,
                    link: None,
                    body: Vec::new(),
                }),
            }
        }
    }

    #[quickcheck]
    fn prop_listing_is_union_of_pages(pages: u8, page_size: u8) -> bool {
        let pages = (pages % 12) as usize + 1;
        let page_size = (page_size % 7) as usize;
        let base = "https://api.example.test";

        let mut served = HashMap::new();
        let mut expected = Vec::new();
        for p in 0..pages {
            let key = if p == 0 {
                format!("{base}/user/repos")
            } else {
                format!("{base}/page/{p}")
            };
            let items: Vec<_> = (0..page_size)
                .map(|i| {
                    let name = format!("r{p}-{i}");
                    expected.push(format!("octo/{name}"));
                    repo_json("octo", &name, false)
                })
                .collect();
            let link = (p + 1 < pages)
                .then(|| format!(r#"<{base}/page/{}?per_page=100>; rel="next""#, p + 1));
            served.insert(key, (items, link));
        }

        let transport = Arc::new(PagedTransport {
            pages: served,
            requests: Mutex::new(0),
        });
        let client = GitHubClient::new(
            transport.clone(),
            Url::parse(base).unwrap(),
            None,
            Some("token"),
        );
        let request = ListingRequest {
            scope: ListingScope::Authenticated,
            account: None,
            owner_filter: false,
            owned_only: false,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let repos = runtime.block_on(client.list_repositories(&request)).unwrap();
        let paths: Vec<String> = repos.iter().map(|r| r.path().to_string()).collect();

        paths == expected && *transport.requests.lock().unwrap() == pages
    }
}
