//! Fetching package definitions for dependencies that are not on disk.
//!
//! A definition is looked up in two places, in order:
//! - the central `sampctl/plugins` repository, where maintainers stage fixed
//!   definitions for third-party packages (JSON only)
//! - the package's own repository, at its default branch (`pawn.json`, then
//!   `pawn.yaml`)
//!
//! Every network call made for one lookup shares a single [`FetchContext`],
//! so the caller can bound or cancel the whole lookup at once.

use crate::codec::ManifestFormat;
use crate::dependency::DependencyMeta;
use crate::manifest::{ManifestError, Package};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur while fetching a remote definition.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// A definition URL answered with something other than 200.
    #[error("package '{meta}' not found at '{url}' (status {status})")]
    Status {
        meta: String,
        url: String,
        status: u16,
    },

    /// Repository not found through the hosting API.
    #[error("repository '{owner}/{repo}' not found")]
    RepositoryNotFound { owner: String, repo: String },

    /// JSON parsing error on an API response.
    #[error("JSON error: {0}")]
    Json(String),

    /// The fetched definition could not be decoded.
    #[error("failed to decode package '{meta}': {source}")]
    Decode { meta: String, source: ManifestError },

    /// Neither `pawn.json` nor `pawn.yaml` exists in the package repository.
    #[error("package '{meta}' does not point to a valid remote package")]
    InvalidRemotePackage { meta: String },

    /// GitHub API rate limit exceeded.
    #[error("GitHub API rate limit exceeded. Try again later or provide a GITHUB_TOKEN")]
    RateLimitExceeded,

    #[error("fetch cancelled")]
    Cancelled,

    #[error("fetch deadline exceeded")]
    DeadlineExceeded,
}

impl RemoteError {
    /// Whether the error came from the shared context rather than a source.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Configuration for remote definition lookups.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL raw repository files are served from.
    pub raw_base: String,
    /// Base URL of the repository hosting API.
    pub api_base: String,
    /// `owner/repo` of the central definitions repository.
    pub central_repo: String,
    /// Branch of the central definitions repository.
    pub central_branch: String,
    /// Optional GitHub token for API authentication.
    pub github_token: Option<String>,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Upper bound for a single request when the context sets no deadline.
    pub request_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            raw_base: "https://raw.githubusercontent.com".to_string(),
            api_base: "https://api.github.com".to_string(),
            central_repo: "sampctl/plugins".to_string(),
            central_branch: "master".to_string(),
            github_token: std::env::var("GITHUB_TOKEN").ok(),
            user_agent: format!("pawn-package/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RemoteConfig {
    /// URL of a package's definition in the central repository.
    #[must_use]
    pub fn central_url(&self, meta: &DependencyMeta) -> String {
        format!(
            "{}/{}/{}/{}-{}.json",
            self.raw_base, self.central_repo, self.central_branch, meta.user, meta.repo
        )
    }

    /// URL of a definition file in a package's own repository.
    #[must_use]
    pub fn repo_url(&self, meta: &DependencyMeta, branch: &str, format: ManifestFormat) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base,
            meta.user,
            meta.repo,
            branch,
            format.file_name()
        )
    }
}

/// Deadline and cancellation shared by every request of one lookup.
///
/// Clones share the cancellation flag. Cancelling from another thread stops
/// the lookup before its next request; a request already in flight runs until
/// it completes or its own timeout (the time left before the deadline) fires.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl FetchContext {
    /// A context with no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    /// Cancel this context and all of its clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left for the next request, `None` if unbounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the context is cancelled or its deadline has passed.
    pub fn remaining(&self) -> Result<Option<Duration>, RemoteError> {
        if self.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        match self.deadline {
            None => Ok(None),
            Some(deadline) => deadline
                .checked_duration_since(Instant::now())
                .filter(|left| !left.is_zero())
                .map(Some)
                .ok_or(RemoteError::DeadlineExceeded),
        }
    }
}

/// Response to a raw file request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// The repository hosting service a package lives on.
pub trait RepositoryHost {
    /// Name of the repository's default branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be looked up.
    fn default_branch(&self, ctx: &FetchContext, owner: &str, repo: &str)
        -> Result<String, RemoteError>;

    /// GET a raw file. Non-200 statuses are returned, not treated as errors.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an exhausted context.
    fn get_raw(&self, ctx: &FetchContext, url: &str) -> Result<RawResponse, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    default_branch: String,
}

/// [`RepositoryHost`] backed by the GitHub API.
pub struct GitHubHost {
    config: RemoteConfig,
    http_client: reqwest::blocking::Client,
}

impl GitHubHost {
    /// Create a host client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_config(RemoteConfig::default())
    }

    /// Create a host client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(config: RemoteConfig) -> Result<Self, RemoteError> {
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn send(
        &self,
        ctx: &FetchContext,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, RemoteError> {
        let req = match ctx.remaining()? {
            Some(left) => req.timeout(left.min(self.config.request_timeout)),
            None => req,
        };
        req.send().map_err(|e| {
            if e.is_timeout() && ctx.remaining().is_err() {
                RemoteError::DeadlineExceeded
            } else {
                RemoteError::Network(e.to_string())
            }
        })
    }
}

impl RepositoryHost for GitHubHost {
    fn default_branch(
        &self,
        ctx: &FetchContext,
        owner: &str,
        repo: &str,
    ) -> Result<String, RemoteError> {
        let url = format!("{}/repos/{owner}/{repo}", self.config.api_base);
        let mut req = self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(ref token) = self.config.github_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = self.send(ctx, req)?;

        if response.status() == reqwest::StatusCode::FORBIDDEN
            && response
                .headers()
                .get("X-RateLimit-Remaining")
                .is_some_and(|v| v == "0")
        {
            return Err(RemoteError::RateLimitExceeded);
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::RepositoryNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(RemoteError::Network(format!(
                "GitHub API returned status {}",
                response.status()
            )));
        }

        let repository: GitHubRepository = response
            .json()
            .map_err(|e| RemoteError::Json(e.to_string()))?;
        Ok(repository.default_branch)
    }

    fn get_raw(&self, ctx: &FetchContext, url: &str) -> Result<RawResponse, RemoteError> {
        let response = self.send(ctx, self.http_client.get(url))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(RawResponse { status, body })
    }
}

/// Looks up package definitions for dependencies.
pub struct PackageFetcher<H> {
    host: H,
    config: RemoteConfig,
}

impl PackageFetcher<GitHubHost> {
    /// A fetcher talking to GitHub.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn github(config: RemoteConfig) -> Result<Self, RemoteError> {
        let host = GitHubHost::with_config(config.clone())?;
        Ok(Self::new(host, config))
    }
}

impl<H: RepositoryHost> PackageFetcher<H> {
    #[must_use]
    pub fn new(host: H, config: RemoteConfig) -> Self {
        Self { host, config }
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Fetch the definition for `meta`, from the central repository if it
    /// has one, otherwise from the package's own repository.
    ///
    /// # Errors
    ///
    /// Returns the own-repository error if both sources fail, or the context
    /// error if the context is cancelled or expires.
    pub fn fetch(&self, ctx: &FetchContext, meta: &DependencyMeta) -> Result<Package, RemoteError> {
        match self.from_central(ctx, meta) {
            Ok(pkg) => Ok(pkg),
            Err(e) if e.is_interrupted() => Err(e),
            Err(e) => {
                tracing::debug!(
                    package = %meta,
                    error = %e,
                    "central definition unavailable, trying package repository"
                );
                self.from_repo(ctx, meta)
            }
        }
    }

    /// Fetch the definition staged in the central repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition does not exist there or is invalid.
    pub fn from_central(
        &self,
        ctx: &FetchContext,
        meta: &DependencyMeta,
    ) -> Result<Package, RemoteError> {
        ctx.remaining()?;
        let url = self.config.central_url(meta);
        let response = self.host.get_raw(ctx, &url)?;
        if response.status != 200 {
            return Err(RemoteError::Status {
                meta: meta.to_string(),
                url,
                status: response.status,
            });
        }
        decode_response(ManifestFormat::Json, &response.body, &url, meta)
    }

    /// Fetch the definition from the package's own repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be found, a request fails,
    /// or neither `pawn.json` nor `pawn.yaml` exists at its default branch.
    pub fn from_repo(
        &self,
        ctx: &FetchContext,
        meta: &DependencyMeta,
    ) -> Result<Package, RemoteError> {
        ctx.remaining()?;
        let branch = self.host.default_branch(ctx, &meta.user, &meta.repo)?;

        for format in ManifestFormat::PROBE_ORDER {
            ctx.remaining()?;
            let url = self.config.repo_url(meta, &branch, format);
            let response = self.host.get_raw(ctx, &url)?;
            if response.status == 200 {
                return decode_response(format, &response.body, &url, meta);
            }
            tracing::debug!(package = %meta, %url, status = response.status, "no definition");
        }

        Err(RemoteError::InvalidRemotePackage {
            meta: meta.to_string(),
        })
    }
}

fn decode_response(
    format: ManifestFormat,
    body: &str,
    url: &str,
    meta: &DependencyMeta,
) -> Result<Package, RemoteError> {
    let mut pkg = Package::decode(format, body, url).map_err(|source| RemoteError::Decode {
        meta: meta.to_string(),
        source,
    })?;
    inherit_identity(&mut pkg.meta, meta);
    Ok(pkg)
}

/// Identity fields a fetched definition leaves out come from the request.
fn inherit_identity(dst: &mut DependencyMeta, src: &DependencyMeta) {
    if dst.user.is_empty() {
        dst.user.clone_from(&src.user);
    }
    if dst.repo.is_empty() {
        dst.repo.clone_from(&src.repo);
    }
    if dst.site.is_none() {
        dst.site.clone_from(&src.site);
    }
    if dst.path.is_none() {
        dst.path.clone_from(&src.path);
    }
    if dst.pin.is_none() {
        dst.pin.clone_from(&src.pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::VersionPin;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    const CENTRAL: &str = "https://raw.githubusercontent.com/sampctl/plugins/master/user-repo.json";
    const REPO_JSON: &str = "https://raw.githubusercontent.com/user/repo/main/pawn.json";
    const REPO_YAML: &str = "https://raw.githubusercontent.com/user/repo/main/pawn.yaml";

    #[derive(Default)]
    struct StubHost {
        responses: HashMap<String, RawResponse>,
        broken: HashSet<String>,
        forbid_repo: bool,
        calls: RefCell<Vec<String>>,
    }

    impl StubHost {
        fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                RawResponse {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl RepositoryHost for StubHost {
        fn default_branch(
            &self,
            _ctx: &FetchContext,
            owner: &str,
            repo: &str,
        ) -> Result<String, RemoteError> {
            assert!(
                !self.forbid_repo,
                "package repository consulted although the central definition exists"
            );
            self.calls.borrow_mut().push(format!("api:{owner}/{repo}"));
            Ok("main".to_string())
        }

        fn get_raw(&self, _ctx: &FetchContext, url: &str) -> Result<RawResponse, RemoteError> {
            self.calls.borrow_mut().push(url.to_string());
            if self.broken.contains(url) {
                return Err(RemoteError::Network("connection reset".to_string()));
            }
            Ok(self.responses.get(url).cloned().unwrap_or(RawResponse {
                status: 404,
                body: "404: Not Found".to_string(),
            }))
        }
    }

    fn fetcher(host: StubHost) -> PackageFetcher<StubHost> {
        PackageFetcher::new(host, RemoteConfig::default())
    }

    fn meta() -> DependencyMeta {
        DependencyMeta::new("user", "repo")
    }

    #[test]
    fn urls() {
        let config = RemoteConfig::default();
        assert_eq!(config.central_url(&meta()), CENTRAL);
        assert_eq!(config.repo_url(&meta(), "main", ManifestFormat::Json), REPO_JSON);
        assert_eq!(config.repo_url(&meta(), "main", ManifestFormat::Yaml), REPO_YAML);
    }

    #[test]
    fn central_definition_wins() {
        let host = StubHost {
            forbid_repo: true,
            ..StubHost::default()
        }
        .respond(CENTRAL, 200, r#"{"entry": "central.pwn"}"#)
        .respond(REPO_JSON, 200, r#"{"entry": "repo.pwn"}"#);
        let fetcher = fetcher(host);

        let pkg = fetcher.fetch(&FetchContext::new(), &meta()).unwrap();
        assert_eq!(pkg.entry.as_deref(), Some("central.pwn"));
        assert_eq!(fetcher.host().calls(), vec![CENTRAL.to_string()]);
    }

    #[test]
    fn falls_back_to_repo_json() {
        let host = StubHost::default().respond(REPO_JSON, 200, r#"{"entry": "repo.pwn"}"#);
        let fetcher = fetcher(host);

        let pkg = fetcher.fetch(&FetchContext::new(), &meta()).unwrap();
        assert_eq!(pkg.entry.as_deref(), Some("repo.pwn"));
        assert_eq!(pkg.format, Some(ManifestFormat::Json));
        assert_eq!(
            fetcher.host().calls(),
            vec![
                CENTRAL.to_string(),
                "api:user/repo".to_string(),
                REPO_JSON.to_string(),
            ]
        );
    }

    #[test]
    fn falls_back_to_repo_yaml() {
        let host = StubHost::default().respond(REPO_YAML, 200, "entry: yaml.pwn\n");
        let fetcher = fetcher(host);

        let pkg = fetcher.fetch(&FetchContext::new(), &meta()).unwrap();
        assert_eq!(pkg.entry.as_deref(), Some("yaml.pwn"));
        assert_eq!(pkg.format, Some(ManifestFormat::Yaml));
        assert_eq!(fetcher.host().calls().last().map(String::as_str), Some(REPO_YAML));
    }

    #[test]
    fn central_transport_error_falls_back() {
        let mut host = StubHost::default().respond(REPO_JSON, 200, "{}");
        host.broken.insert(CENTRAL.to_string());
        let pkg = fetcher(host).fetch(&FetchContext::new(), &meta()).unwrap();
        assert_eq!(pkg.meta.repo, "repo");
    }

    #[test]
    fn no_definition_anywhere() {
        let fetcher = fetcher(StubHost::default());
        let err = fetcher.fetch(&FetchContext::new(), &meta()).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidRemotePackage { .. }));
        assert!(err.to_string().contains("does not point to a valid remote package"));
        assert_eq!(fetcher.host().calls().len(), 4);
    }

    #[test]
    fn invalid_repo_definition_is_an_error() {
        let host = StubHost::default().respond(REPO_JSON, 200, r#"{"unknown": 1}"#);
        let err = fetcher(host).fetch(&FetchContext::new(), &meta()).unwrap_err();
        assert!(matches!(err, RemoteError::Decode { .. }));
    }

    #[test]
    fn fetched_package_inherits_identity() {
        let host = StubHost::default().respond(CENTRAL, 200, r#"{"include_path": "include"}"#);
        let meta = meta().with_pin(VersionPin::Tag("1.0.0".to_string()));
        let pkg = fetcher(host).fetch(&FetchContext::new(), &meta).unwrap();
        assert_eq!(pkg.meta.user, "user");
        assert_eq!(pkg.meta.repo, "repo");
        assert_eq!(pkg.meta.tag(), Some("1.0.0"));
        assert_eq!(pkg.include_path.as_deref(), Some("include"));
    }

    #[test]
    fn cancelled_context_makes_no_requests() {
        let ctx = FetchContext::new();
        ctx.clone().cancel();
        let fetcher = fetcher(StubHost::default());
        let err = fetcher.fetch(&ctx, &meta()).unwrap_err();
        assert!(matches!(err, RemoteError::Cancelled));
        assert!(fetcher.host().calls().is_empty());
    }

    #[test]
    fn expired_deadline_stops_lookup() {
        let ctx = FetchContext::with_deadline(Instant::now());
        let fetcher = fetcher(StubHost::default());
        let err = fetcher.fetch(&ctx, &meta()).unwrap_err();
        assert!(matches!(err, RemoteError::DeadlineExceeded));
        assert!(fetcher.host().calls().is_empty());
    }

    #[test]
    fn fetched_package_cannot_be_written_in_place() {
        let host = StubHost::default().respond(CENTRAL, 200, r#"{"entry": "dep.pwn"}"#);
        let pkg = fetcher(host).fetch(&FetchContext::new(), &meta()).unwrap();
        assert_eq!(pkg.format, Some(ManifestFormat::Json));
        assert_eq!(pkg.local_path, None);

        let err = pkg.write_definition().unwrap_err();
        assert!(matches!(err, ManifestError::NoLocalPath(_)));
    }

    #[test]
    fn context_remaining() {
        assert!(FetchContext::new().remaining().unwrap().is_none());
        let left = FetchContext::with_timeout(Duration::from_secs(30))
            .remaining()
            .unwrap()
            .unwrap();
        assert!(left <= Duration::from_secs(30));
    }

    fn reply(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut out = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n",
            body.len()
        );
        for (name, value) in headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    /// Answer one connection per reply, in order, on a loopback port. Each
    /// reply is written after its delay. Request heads are sent back on the
    /// returned channel.
    fn serve(replies: Vec<(Duration, String)>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for (delay, reply) in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
                thread::sleep(delay);
                let _ = stream.write_all(reply.as_bytes());
            }
        });

        (base, rx)
    }

    fn loopback_config(base: &str) -> RemoteConfig {
        RemoteConfig {
            raw_base: base.to_string(),
            api_base: base.to_string(),
            github_token: None,
            ..RemoteConfig::default()
        }
    }

    fn request_line(head: &str) -> &str {
        head.lines().next().unwrap_or_default()
    }

    #[test]
    fn github_default_branch() {
        let body = r#"{"default_branch": "trunk", "name": "repo"}"#;
        let (base, requests) = serve(vec![(Duration::ZERO, reply("200 OK", &[], body))]);
        let config = RemoteConfig {
            github_token: Some("secret".to_string()),
            ..loopback_config(&base)
        };
        let host = GitHubHost::with_config(config).unwrap();

        let branch = host.default_branch(&FetchContext::new(), "user", "repo").unwrap();
        assert_eq!(branch, "trunk");

        let head = requests.recv().unwrap();
        assert_eq!(request_line(&head), "GET /repos/user/repo HTTP/1.1");
        assert!(head.to_ascii_lowercase().contains("authorization: bearer secret"));
    }

    #[test]
    fn github_missing_repository() {
        let (base, _requests) = serve(vec![(
            Duration::ZERO,
            reply("404 Not Found", &[], r#"{"message": "Not Found"}"#),
        )]);
        let host = GitHubHost::with_config(loopback_config(&base)).unwrap();

        let err = host.default_branch(&FetchContext::new(), "user", "gone").unwrap_err();
        assert!(matches!(
            err,
            RemoteError::RepositoryNotFound { ref owner, ref repo }
                if owner == "user" && repo == "gone"
        ));
    }

    #[test]
    fn github_rate_limit() {
        let (base, _requests) = serve(vec![
            (
                Duration::ZERO,
                reply("403 Forbidden", &[("X-RateLimit-Remaining", "0")], "{}"),
            ),
            (Duration::ZERO, reply("403 Forbidden", &[], "{}")),
        ]);
        let host = GitHubHost::with_config(loopback_config(&base)).unwrap();
        let ctx = FetchContext::new();

        let err = host.default_branch(&ctx, "user", "repo").unwrap_err();
        assert!(matches!(err, RemoteError::RateLimitExceeded));

        // A 403 that is not a rate limit is a plain failure.
        let err = host.default_branch(&ctx, "user", "repo").unwrap_err();
        assert!(matches!(err, RemoteError::Network(ref msg) if msg.contains("403")));
    }

    #[test]
    fn github_raw_returns_status() {
        let (base, requests) = serve(vec![(
            Duration::ZERO,
            reply("404 Not Found", &[], "404: Not Found"),
        )]);
        let host = GitHubHost::with_config(loopback_config(&base)).unwrap();

        let url = format!("{base}/user/repo/main/pawn.json");
        let response = host.get_raw(&FetchContext::new(), &url).unwrap();
        assert_eq!(
            response,
            RawResponse {
                status: 404,
                body: "404: Not Found".to_string(),
            }
        );
        assert_eq!(
            request_line(&requests.recv().unwrap()),
            "GET /user/repo/main/pawn.json HTTP/1.1"
        );
    }

    #[test]
    fn stalled_request_ends_at_context_deadline() {
        let (base, _requests) = serve(vec![(
            Duration::from_secs(3),
            reply("200 OK", &[], "{}"),
        )]);
        let host = GitHubHost::with_config(loopback_config(&base)).unwrap();
        assert_eq!(host.config().request_timeout, Duration::from_secs(60));

        let started = Instant::now();
        let ctx = FetchContext::with_timeout(Duration::from_millis(200));
        let err = host.get_raw(&ctx, &format!("{base}/slow")).unwrap_err();
        assert!(matches!(err, RemoteError::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn request_timeout_without_deadline_is_a_network_error() {
        let (base, _requests) = serve(vec![(
            Duration::from_secs(3),
            reply("200 OK", &[], "{}"),
        )]);
        let config = RemoteConfig {
            request_timeout: Duration::from_millis(200),
            ..loopback_config(&base)
        };
        let host = GitHubHost::with_config(config).unwrap();

        let err = host.get_raw(&FetchContext::new(), &format!("{base}/slow")).unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }

    #[test]
    fn github_fetch_end_to_end() {
        let (base, requests) = serve(vec![
            (Duration::ZERO, reply("404 Not Found", &[], "404: Not Found")),
            (Duration::ZERO, reply("200 OK", &[], r#"{"default_branch": "trunk"}"#)),
            (Duration::ZERO, reply("200 OK", &[], r#"{"entry": "main.pwn"}"#)),
        ]);
        let fetcher = PackageFetcher::github(loopback_config(&base)).unwrap();

        let ctx = FetchContext::with_timeout(Duration::from_secs(10));
        let pkg = fetcher.fetch(&ctx, &meta()).unwrap();
        assert_eq!(pkg.entry.as_deref(), Some("main.pwn"));
        assert_eq!(pkg.meta.user, "user");

        let lines: Vec<String> = requests
            .iter()
            .take(3)
            .map(|head| request_line(&head).to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "GET /sampctl/plugins/master/user-repo.json HTTP/1.1",
                "GET /repos/user/repo HTTP/1.1",
                "GET /user/repo/trunk/pawn.json HTTP/1.1",
            ]
        );

        let err = pkg.write_definition().unwrap_err();
        assert!(matches!(err, ManifestError::NoLocalPath(_)));
    }
}
