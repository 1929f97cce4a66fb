//! Blocking HTTP backend for a hosted repository's content API.
//!
//! Every document is a file on one branch. `GET` returns the base64 body
//! and its blob hash, `PUT` replaces it under that hash as a
//! precondition. All retry and rate-limit waiting happens here and blocks
//! the calling thread.

use core::time::Duration;
use std::thread;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::Rng as _;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{
    ConnectionConfig, DEFAULT_API_BASE, DEFAULT_BRANCH, RetryPolicy, validate_repository,
};
use crate::error::{LedgerError, Result};
use crate::models::VersionToken;
use crate::storage::{DocumentBackend, VersionedDocument, render_document};

/// Media type requested from the API.
const ACCEPT_JSON: &str = "application/vnd.github+json";

/// API version header name.
const API_VERSION_HEADER: &str = "x-github-api-version";

/// API version pinned by this client.
const API_VERSION: &str = "2022-11-28";

/// Remaining-quota header name.
const RATE_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Quota reset header name (epoch seconds).
const RATE_RESET_HEADER: &str = "x-ratelimit-reset";

/// Wait used when a quota is exhausted but no reset time is given.
const FALLBACK_QUOTA_WAIT: Duration = Duration::from_secs(60);

/// Body phrases that signal a secondary (burst) rate limit.
const BURST_PHRASES: &[&str] = &["secondary rate limit", "abuse detection"];

/// How a response should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResponseClass {
    /// 2xx.
    Success,
    /// The document does not exist.
    NotFound,
    /// The version precondition failed or was missing.
    Conflict,
    /// The credentials were rejected.
    AccessDenied,
    /// The primary quota is used up; wait the given time.
    QuotaExhausted {
        /// Time until the quota resets.
        wait: Duration,
    },
    /// A secondary limit tripped; wait the given time or a random interval.
    BurstLimited {
        /// Wait requested by the provider, if any.
        wait: Option<Duration>,
    },
    /// Any other failure.
    Failed,
}

/// Classifies a response by status, headers and body.
///
/// The burst-limit check is a body-text heuristic; it lives only here so
/// the retry loop does not depend on it.
pub(crate) fn classify(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    now_epoch: u64,
) -> ResponseClass {
    if status.is_success() {
        return ResponseClass::Success;
    }
    let lowered = body.to_lowercase();
    match status.as_u16() {
        404 => ResponseClass::NotFound,
        409 => ResponseClass::Conflict,
        422 if lowered.contains("sha") => ResponseClass::Conflict,
        401 => ResponseClass::AccessDenied,
        403 | 429 => {
            if header_u64(headers, RATE_REMAINING_HEADER) == Some(0) {
                let wait = retry_after(headers)
                    .or_else(|| {
                        header_u64(headers, RATE_RESET_HEADER)
                            .map(|reset| Duration::from_secs(reset.saturating_sub(now_epoch)))
                    })
                    .unwrap_or(FALLBACK_QUOTA_WAIT);
                ResponseClass::QuotaExhausted { wait }
            } else if status == StatusCode::TOO_MANY_REQUESTS
                || BURST_PHRASES.iter().any(|phrase| lowered.contains(phrase))
            {
                ResponseClass::BurstLimited {
                    wait: retry_after(headers),
                }
            } else {
                ResponseClass::AccessDenied
            }
        }
        _ => ResponseClass::Failed,
    }
}

/// Parses a header holding a non-negative integer.
fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Parses a `Retry-After` header given in seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_u64(headers, RETRY_AFTER.as_str()).map(Duration::from_secs)
}

/// Current Unix time in seconds.
fn now_epoch() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Random duration in `[min, max]` at millisecond resolution.
fn random_between(min: Duration, max: Duration) -> Duration {
    let low = u64::try_from(min.min(max).as_millis()).unwrap_or(u64::MAX);
    let high = u64::try_from(min.max(max).as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::rng().random_range(low..=high))
}

/// Whether a transport error is worth retrying.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

/// A response after retries, with its class.
#[derive(Debug)]
struct Reply {
    /// HTTP status.
    status: StatusCode,
    /// Classification of the response.
    class: ResponseClass,
    /// Response body text.
    body: String,
}

/// The file envelope returned by `GET .../contents/{path}`.
#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    /// Base64 body, possibly wrapped across lines.
    #[serde(default)]
    content: Option<String>,
    /// Blob hash.
    sha: String,
}

/// Request body for `PUT .../contents/{path}`.
#[derive(Debug, Serialize)]
struct PutRequest<'body> {
    /// Commit message.
    message: &'body str,
    /// Base64 body.
    content: String,
    /// Target branch.
    branch: &'body str,
    /// Expected current blob hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'body str>,
}

/// Response of a successful `PUT`.
#[derive(Debug, Deserialize)]
struct PutResponse {
    /// The written file.
    content: PutContent,
}

/// File part of [`PutResponse`].
#[derive(Debug, Deserialize)]
struct PutContent {
    /// New blob hash.
    sha: String,
}

/// Builder for constructing a [`ContentsClient`].
#[derive(Debug)]
pub struct ContentsClientBuilder {
    /// Repository in `owner/name` form.
    repository: Option<String>,
    /// Access token.
    token: Option<SecretString>,
    /// Branch override.
    branch: Option<String>,
    /// Base URL override (for testing).
    base_url: Option<String>,
    /// Retry policy override.
    retry_policy: Option<RetryPolicy>,
}

impl ContentsClientBuilder {
    /// Sets the repository in `owner/name` form.
    #[inline]
    #[must_use]
    pub fn repository<T: Into<String>>(mut self, repository: T) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Sets the access token.
    #[inline]
    #[must_use]
    pub fn token<T: Into<String>>(mut self, token: T) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Sets the branch (default `main`).
    #[inline]
    #[must_use]
    pub fn branch<T: Into<String>>(mut self, branch: T) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Overrides the base URL (useful for testing with a mock server).
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Overrides the retry policy.
    #[inline]
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingSetting`] if no repository or token
    /// was provided, [`LedgerError::InvalidArgument`] if the repository
    /// is malformed, and [`LedgerError::Http`] if the HTTP client fails
    /// to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<ContentsClient> {
        let repository = self.repository.ok_or(LedgerError::MissingSetting("repository"))?;
        validate_repository(&repository)?;
        let token = self.token.ok_or(LedgerError::MissingSetting("token"))?;
        let branch = self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_owned());
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let policy = self.retry_policy.unwrap_or_default();
        tracing::debug!(base_url = %base_url, repository = %repository, branch = %branch, "building client");

        let mut headers = HeaderMap::new();
        let _accept = headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        let _api_version = headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("repo-ledger/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(policy.request_timeout)
            .build()?;

        Ok(ContentsClient {
            http,
            token,
            repository,
            branch,
            base_url,
            policy,
        })
    }
}

/// Blocking client for one branch of one repository.
///
/// Use [`ContentsClient::builder()`] or [`ContentsClient::from_config`]
/// to construct an instance.
#[derive(Debug)]
pub struct ContentsClient {
    /// Underlying HTTP client.
    http: reqwest::blocking::Client,
    /// Bearer access token.
    token: SecretString,
    /// Repository in `owner/name` form.
    repository: String,
    /// Branch the documents live on.
    branch: String,
    /// API base URL without trailing slash.
    base_url: String,
    /// Retry and rate-limit bounds.
    policy: RetryPolicy,
}

impl ContentsClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub const fn builder() -> ContentsClientBuilder {
        ContentsClientBuilder {
            repository: None,
            token: None,
            branch: None,
            base_url: None,
            retry_policy: None,
        }
    }

    /// Builds a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    #[inline]
    pub fn from_config(config: &ConnectionConfig, policy: RetryPolicy) -> Result<Self> {
        Self::builder()
            .repository(config.repository.clone())
            .token(config.token())
            .branch(config.branch.clone())
            .base_url(config.api_base.clone())
            .retry_policy(policy)
            .build()
    }

    /// Branch this client reads and writes.
    #[inline]
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Repository this client reads and writes.
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// URL of the contents endpoint for `path`.
    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.base_url,
            self.repository,
            path.trim_start_matches('/')
        )
    }

    /// Fetches and decodes the document at `path` on the branch.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccessDenied`] on 401/403,
    /// [`LedgerError::Encoding`] if the body cannot be decoded, and the
    /// retry errors described on [`LedgerError`].
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub fn get_document(&self, path: &str) -> Result<Option<VersionedDocument>> {
        let url = url::Url::parse_with_params(
            &self.contents_url(path),
            &[("ref", self.branch.as_str())],
        )
        .map_err(|err| LedgerError::InvalidArgument(format!("bad document URL: {err}")))?;
        tracing::trace!(url = %url, "sending GET request");
        let reply = self.execute(path, || {
            self.http
                .get(url.clone())
                .bearer_auth(self.token.expose_secret())
        })?;

        match reply.class {
            ResponseClass::Success => {
                let envelope: ContentEnvelope =
                    serde_json::from_str(&reply.body).map_err(|err| LedgerError::Encoding {
                        path: path.to_owned(),
                        reason: format!("unexpected contents response: {err}"),
                    })?;
                let content = decode_content(path, envelope.content.as_deref().unwrap_or_default())?;
                Ok(Some(VersionedDocument {
                    content,
                    version: VersionToken::new(envelope.sha),
                }))
            }
            ResponseClass::NotFound => {
                tracing::debug!("document not found");
                Ok(None)
            }
            ResponseClass::AccessDenied => Err(access_denied(path, &reply)),
            ResponseClass::Conflict
            | ResponseClass::Failed
            | ResponseClass::QuotaExhausted { .. }
            | ResponseClass::BurstLimited { .. } => Err(store_error(path, reply)),
        }
    }

    /// Creates or replaces the document at `path` on the branch.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Conflict`] if `version` is stale or missing
    /// for an existing document, [`LedgerError::AccessDenied`] on 401/403,
    /// and the retry errors described on [`LedgerError`].
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub fn put_document(
        &self,
        path: &str,
        document: &Value,
        message: &str,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken> {
        let text = render_document(document)?;
        let request = PutRequest {
            message,
            content: STANDARD.encode(text.as_bytes()),
            branch: &self.branch,
            sha: version.map(VersionToken::as_inner),
        };
        let url = self.contents_url(path);
        tracing::trace!(url = %url, body_len = text.len(), "sending PUT request");
        let reply = self.execute(path, || {
            self.http
                .put(&url)
                .bearer_auth(self.token.expose_secret())
                .json(&request)
        })?;

        match reply.class {
            ResponseClass::Success => {
                let response: PutResponse =
                    serde_json::from_str(&reply.body).map_err(|err| LedgerError::Encoding {
                        path: path.to_owned(),
                        reason: format!("unexpected write response: {err}"),
                    })?;
                Ok(VersionToken::new(response.content.sha))
            }
            ResponseClass::Conflict => {
                tracing::debug!(status = reply.status.as_u16(), "version precondition failed");
                Err(LedgerError::Conflict {
                    path: path.to_owned(),
                })
            }
            ResponseClass::AccessDenied => Err(access_denied(path, &reply)),
            ResponseClass::NotFound
            | ResponseClass::Failed
            | ResponseClass::QuotaExhausted { .. }
            | ResponseClass::BurstLimited { .. } => Err(store_error(path, reply)),
        }
    }

    /// Sends the request built by `make`, retrying transport failures up
    /// to `max_retries` times and waiting out rate limits up to
    /// `max_rate_limit_waits` times.
    fn execute<F>(&self, path: &str, make: F) -> Result<Reply>
    where
        F: Fn() -> reqwest::blocking::RequestBuilder,
    {
        let mut failures: u32 = 0;
        let mut rate_waits: u32 = 0;
        loop {
            let outcome = make().send().and_then(|response| {
                let status = response.status();
                let headers = response.headers().clone();
                response.text().map(|body| (status, headers, body))
            });
            match outcome {
                Ok((status, headers, body)) => {
                    tracing::debug!(status = %status, "received response");
                    let class = classify(status, &headers, &body, now_epoch());
                    let wait = match class {
                        ResponseClass::QuotaExhausted { wait } => {
                            wait + random_between(Duration::ZERO, self.policy.reset_jitter_max)
                        }
                        ResponseClass::BurstLimited { wait } => wait.unwrap_or_else(|| {
                            random_between(self.policy.burst_wait_min, self.policy.burst_wait_max)
                        }),
                        ResponseClass::Success
                        | ResponseClass::NotFound
                        | ResponseClass::Conflict
                        | ResponseClass::AccessDenied
                        | ResponseClass::Failed => return Ok(Reply { status, class, body }),
                    };
                    rate_waits += 1;
                    if rate_waits > self.policy.max_rate_limit_waits {
                        return Err(LedgerError::RateLimited(format!(
                            "{path}: still limited after {} waits (HTTP {status})",
                            self.policy.max_rate_limit_waits
                        )));
                    }
                    tracing::warn!(
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        attempt = rate_waits,
                        "rate limited, waiting"
                    );
                    thread::sleep(wait);
                }
                Err(err) if is_transient(&err) => {
                    failures += 1;
                    if failures > self.policy.max_retries {
                        return Err(LedgerError::Transient {
                            path: path.to_owned(),
                            attempts: failures,
                            reason: err.to_string(),
                        });
                    }
                    tracing::warn!(error = %err, attempt = failures, "request failed, retrying");
                    thread::sleep(self.policy.retry_delay);
                }
                Err(err) => return Err(LedgerError::Http(err)),
            }
        }
    }
}

/// Decodes a base64 body (line breaks allowed) into JSON. An empty body
/// decodes to `null`.
fn decode_content(path: &str, encoded: &str) -> Result<Value> {
    let compact: String = encoded.chars().filter(|ch| !ch.is_whitespace()).collect();
    let encoding_error = |reason: String| LedgerError::Encoding {
        path: path.to_owned(),
        reason,
    };
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| encoding_error(format!("invalid base64: {err}")))?;
    let text = String::from_utf8(bytes).map_err(|err| encoding_error(format!("invalid UTF-8: {err}")))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|err| encoding_error(format!("invalid JSON: {err}")))
}

/// Builds the access-denied error for a reply.
fn access_denied(path: &str, reply: &Reply) -> LedgerError {
    tracing::debug!(status = reply.status.as_u16(), "access denied");
    LedgerError::AccessDenied {
        path: path.to_owned(),
        status: reply.status.as_u16(),
        body: reply.body.clone(),
    }
}

/// Builds the generic store error for a reply.
fn store_error(path: &str, reply: Reply) -> LedgerError {
    tracing::debug!(status = reply.status.as_u16(), message = %reply.body, "store error");
    LedgerError::Store {
        path: path.to_owned(),
        status: reply.status.as_u16(),
        message: reply.body,
    }
}

impl DocumentBackend for ContentsClient {
    #[inline]
    fn fetch(&self, path: &str) -> Result<Option<VersionedDocument>> {
        self.get_document(path)
    }

    #[inline]
    fn put(
        &self,
        path: &str,
        document: &Value,
        message: &str,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken> {
        self.put_document(path, document, message, version)
    }
}
