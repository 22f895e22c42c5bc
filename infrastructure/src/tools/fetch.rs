//! fetch_url tool: guarded HTTP GET with manual redirect handling
//!
//! Redirects are disabled in the HTTP client and followed here, one hop at a
//! time. Every hop target goes back through [`NetworkGuard`] (SSRF checks
//! and the domain allow-list) before any request is made to it, and the body
//! of a redirect response is never read.
//!
//! The hop transport is the [`HttpHop`] trait. [`ReqwestHop`] is the real
//! one: it builds a client per hop that is pinned to the addresses the guard
//! checked, so a second DNS answer cannot send the request elsewhere.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, LOCATION};
use thiserror::Error;
use tracing::{debug, info, warn};
use warden_domain::{GuardPolicy, ToolCall, ToolDescriptor, ToolError, ToolResult, ToolResultMetadata};

use crate::content::{ContentNormalizer, NormalizedContent};
use crate::guard::{GuardError, NetworkGuard, ValidatedUrl};

/// Tool name constant
pub const FETCH_URL: &str = "fetch_url";

/// Maximum number of redirects followed
pub const MAX_REDIRECTS: usize = 5;

/// Maximum response body read (5 MB)
pub const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Default overall timeout for one fetch, redirects included
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_USER_AGENT: &str = concat!("warden/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("Too many redirects (maximum {0})")]
    TooManyRedirects(usize),

    #[error("Redirect response {0} without a Location header")]
    MissingLocation(u16),

    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl FetchError {
    pub fn to_tool_error(&self) -> ToolError {
        match self {
            FetchError::Guard(e) => e.to_tool_error(),
            FetchError::TooManyRedirects(_)
            | FetchError::MissingLocation(_)
            | FetchError::InvalidRedirect(_) => ToolError::validation_failed(self.to_string()),
            FetchError::Timeout(_) => ToolError::timeout(self.to_string()),
            FetchError::Request(_) | FetchError::Body(_) => {
                ToolError::execution_failed(self.to_string())
            }
        }
    }
}

/// Body of a hop response, read at most once
#[async_trait]
pub trait HopBody: Send {
    /// Read up to `limit` bytes. The flag is set when the body was longer.
    async fn read(&mut self, limit: usize) -> Result<(Vec<u8>, bool), FetchError>;
}

/// Status and headers of one hop; the body stays unread until asked for
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Box<dyn HopBody>,
}

/// Issues a single request, never following redirects
#[async_trait]
pub trait HttpHop: Send + Sync {
    async fn send(&self, url: &ValidatedUrl) -> Result<HopResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// reqwest-backed hop: redirects off, proxies off, DNS pinned
pub struct ReqwestHop {
    settings: FetchSettings,
}

impl ReqwestHop {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn client_for(&self, url: &ValidatedUrl) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .timeout(self.settings.timeout)
            .user_agent(self.settings.user_agent.as_str());

        if url.is_domain() {
            builder = builder.resolve_to_addrs(url.host(), url.resolved());
        }

        builder
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to build HTTP client: {}", e)))
    }
}

#[async_trait]
impl HttpHop for ReqwestHop {
    async fn send(&self, url: &ValidatedUrl) -> Result<HopResponse, FetchError> {
        let client = self.client_for(url)?;
        let response = client.get(url.url().clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.settings.timeout)
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let location = header(LOCATION);
        let content_type = header(CONTENT_TYPE);

        Ok(HopResponse {
            status: response.status().as_u16(),
            location,
            content_type,
            content_length: response.content_length(),
            body: Box::new(ReqwestBody(response)),
        })
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl HopBody for ReqwestBody {
    async fn read(&mut self, limit: usize) -> Result<(Vec<u8>, bool), FetchError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self
            .0
            .chunk()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?
        {
            let room = limit - buf.len();
            if chunk.len() > room {
                buf.extend_from_slice(&chunk[..room]);
                return Ok((buf, true));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok((buf, false))
    }
}

/// Outcome of a completed fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub content: NormalizedContent,
    /// Body bytes actually read (zero for binary media)
    pub bytes: usize,
    pub redirects: usize,
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Follow redirects from an already-validated start URL.
///
/// Every hop is re-validated and re-checked against `policy` before it is
/// requested. Binary media is classified from the headers and never read.
pub async fn fetch_validated(
    hop: &dyn HttpHop,
    start: ValidatedUrl,
    policy: &GuardPolicy,
) -> Result<FetchedPage, FetchError> {
    let mut current = start;
    let mut redirects = 0;

    loop {
        let HopResponse {
            status,
            location,
            content_type,
            content_length,
            mut body,
        } = hop.send(&current).await?;

        if is_redirect(status) {
            drop(body);
            if redirects >= MAX_REDIRECTS {
                warn!(url = %current, "Redirect limit reached");
                return Err(FetchError::TooManyRedirects(MAX_REDIRECTS));
            }
            let location = location.ok_or(FetchError::MissingLocation(status))?;
            let next = current
                .url()
                .join(&location)
                .map_err(|e| FetchError::InvalidRedirect(format!("{}: {}", location, e)))?;

            let validated = NetworkGuard::validate_url(next).await?;
            NetworkGuard::check_allowed(&validated, policy)?;

            redirects += 1;
            debug!(from = %current, to = %validated, hop = redirects, "Following redirect");
            current = validated;
            continue;
        }

        let content_type = content_type.as_deref();
        let (content, bytes) = if ContentNormalizer::is_binary(content_type) {
            (ContentNormalizer::binary_notice(content_type, content_length), 0)
        } else {
            let (raw, over_limit) = body.read(MAX_BODY_SIZE).await?;
            let mut content = ContentNormalizer::clean(&raw, content_type);
            content.truncated |= over_limit;
            (content, raw.len())
        };

        return Ok(FetchedPage {
            final_url: current.to_string(),
            status,
            content,
            bytes,
            redirects,
        });
    }
}

pub fn fetch_url_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        FETCH_URL,
        "Fetch a web page or API endpoint and return its readable content. \
         HTML is converted to text, JSON is pretty-printed.",
    )
    .with_parameter("url", "string", "The http or https URL to fetch", true)
}

/// Execute the fetch_url tool
pub async fn execute_fetch_url(
    hop: &dyn HttpHop,
    timeout: Duration,
    call: &ToolCall,
    policy: &GuardPolicy,
) -> ToolResult {
    let start = Instant::now();

    let url = match call.require_string("url") {
        Ok(u) => u,
        Err(e) => return ToolResult::failure(ToolError::invalid_argument(e)),
    };

    let fetch = async {
        let validated = NetworkGuard::check(url, policy).await?;
        fetch_validated(hop, validated, policy).await
    };
    let outcome = match tokio::time::timeout(timeout, fetch).await {
        Ok(outcome) => outcome,
        Err(_) => Err(FetchError::Timeout(timeout)),
    };

    let page = match outcome {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %url, error = %e, "Fetch failed");
            return ToolResult::failure(e.to_tool_error());
        }
    };

    info!(
        url = %page.final_url,
        status = page.status,
        redirects = page.redirects,
        bytes = page.bytes,
        "Fetched URL"
    );

    let metadata = ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(page.bytes),
        truncated: page.content.truncated,
        status: Some(page.status),
        final_url: Some(page.final_url.clone()),
        ..Default::default()
    };
    ToolResult::success(format_summary(&page)).with_metadata(metadata)
}

fn format_summary(page: &FetchedPage) -> String {
    let mut out = format!("URL: {}\nStatus: {}\n", page.final_url, page.status);
    if let Some(title) = &page.content.title {
        out.push_str(&format!("Title: {}\n", title));
    }
    out.push_str(&format!("Content-Type: {}\n\n", page.content.label));
    out.push_str(&page.content.text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockBody {
        data: Vec<u8>,
        read_flag: Arc<AtomicBool>,
    }

    #[async_trait]
    impl HopBody for MockBody {
        async fn read(&mut self, limit: usize) -> Result<(Vec<u8>, bool), FetchError> {
            self.read_flag.store(true, Ordering::SeqCst);
            let over = self.data.len() > limit;
            Ok((self.data[..self.data.len().min(limit)].to_vec(), over))
        }
    }

    #[derive(Clone)]
    struct Reply {
        status: u16,
        location: Option<&'static str>,
        content_type: Option<&'static str>,
        content_length: Option<u64>,
        body: &'static str,
    }

    impl Reply {
        fn ok(content_type: &'static str, body: &'static str) -> Self {
            Self {
                status: 200,
                location: None,
                content_type: Some(content_type),
                content_length: Some(body.len() as u64),
                body,
            }
        }

        fn redirect(status: u16, location: &'static str) -> Self {
            Self {
                status,
                location: Some(location),
                content_type: Some("text/html"),
                content_length: None,
                body: "<html>moved</html>",
            }
        }
    }

    /// Replies by exact URL; unknown URLs always redirect to `/loop`
    #[derive(Default)]
    struct MockHop {
        replies: HashMap<String, Reply>,
        body_read: Arc<AtomicBool>,
        sends: AtomicUsize,
        visited: Mutex<Vec<String>>,
    }

    impl MockHop {
        fn with(mut self, url: &str, reply: Reply) -> Self {
            self.replies.insert(url.to_string(), reply);
            self
        }
    }

    #[async_trait]
    impl HttpHop for MockHop {
        async fn send(&self, url: &ValidatedUrl) -> Result<HopResponse, FetchError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.visited.lock().unwrap().push(url.to_string());
            let reply = self
                .replies
                .get(url.as_str())
                .cloned()
                .unwrap_or_else(|| Reply::redirect(302, "/loop"));
            Ok(HopResponse {
                status: reply.status,
                location: reply.location.map(str::to_string),
                content_type: reply.content_type.map(str::to_string),
                content_length: reply.content_length,
                body: Box::new(MockBody {
                    data: reply.body.as_bytes().to_vec(),
                    read_flag: self.body_read.clone(),
                }),
            })
        }
    }

    struct StalledHop;

    #[async_trait]
    impl HttpHop for StalledHop {
        async fn send(&self, _url: &ValidatedUrl) -> Result<HopResponse, FetchError> {
            std::future::pending().await
        }
    }

    const START: &str = "http://93.184.216.34/start";

    async fn start() -> ValidatedUrl {
        NetworkGuard::validate(START).await.unwrap()
    }

    fn fetch_call(url: &str) -> ToolCall {
        ToolCall::new(FETCH_URL).with_arg("url", url)
    }

    #[tokio::test]
    async fn test_redirect_to_private_ip_rejected_before_body_read() {
        let hop = MockHop::default().with(START, Reply::redirect(302, "http://127.0.0.1/admin"));

        let err = fetch_validated(&hop, start().await, &GuardPolicy::unrestricted())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Guard(GuardError::PrivateAddress(_))));
        assert!(!hop.body_read.load(Ordering::SeqCst));
        assert_eq!(hop.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_redirect_chain_longer_than_limit_rejected() {
        let hop = MockHop::default();

        let err = fetch_validated(&hop, start().await, &GuardPolicy::unrestricted())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooManyRedirects(MAX_REDIRECTS)));
        assert_eq!(hop.sends.load(Ordering::SeqCst), MAX_REDIRECTS + 1);
        assert!(!hop.body_read.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_redirect_outside_allow_list_rejected() {
        let hop = MockHop::default().with(START, Reply::redirect(301, "http://93.184.216.35/"));
        let policy = GuardPolicy::allow(["93.184.216.34"]);

        let result = execute_fetch_url(&hop, DEFAULT_FETCH_TIMEOUT, &fetch_call(START), &policy).await;

        assert!(result.is_error());
        assert_eq!(result.error().unwrap().code, ToolError::POLICY_DENIED);
        assert_eq!(hop.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relative_redirect_is_followed() {
        let hop = MockHop::default()
            .with(START, Reply::redirect(307, "/docs/page"))
            .with(
                "http://93.184.216.34/docs/page",
                Reply::ok("text/plain; charset=utf-8", "plain body"),
            );

        let page = fetch_validated(&hop, start().await, &GuardPolicy::unrestricted())
            .await
            .unwrap();

        assert_eq!(page.final_url, "http://93.184.216.34/docs/page");
        assert_eq!(page.redirects, 1);
        assert_eq!(page.content.text, "plain body");
        assert_eq!(
            *hop.visited.lock().unwrap(),
            vec![START.to_string(), "http://93.184.216.34/docs/page".to_string()]
        );
    }

    #[tokio::test]
    async fn test_html_summary() {
        let hop = MockHop::default().with(
            START,
            Reply::ok(
                "text/html",
                "<html><head><title>Changelog</title></head><body><main>\
                 <h2>1.4.0</h2><p>Adds pinned DNS resolution for outbound requests.</p>\
                 </main></body></html>",
            ),
        );

        let result = execute_fetch_url(
            &hop,
            DEFAULT_FETCH_TIMEOUT,
            &fetch_call(START),
            &GuardPolicy::unrestricted(),
        )
        .await;

        assert!(result.is_success());
        let text = result.text();
        assert!(text.starts_with("URL: http://93.184.216.34/start\nStatus: 200\nTitle: Changelog\nContent-Type: HTML\n\n"));
        assert!(text.contains("## 1.4.0"));
        assert_eq!(result.metadata().status, Some(200));
        assert_eq!(result.metadata().final_url.as_deref(), Some(START));
    }

    #[tokio::test]
    async fn test_body_read_stops_at_size_limit() {
        let big: &'static str = Box::leak("a".repeat(MAX_BODY_SIZE + 1024).into_boxed_str());
        let hop = MockHop::default().with(START, Reply::ok("text/plain", big));

        let page = fetch_validated(&hop, start().await, &GuardPolicy::unrestricted())
            .await
            .unwrap();

        assert_eq!(page.bytes, MAX_BODY_SIZE);
        assert!(page.content.truncated);
        assert!(hop.body_read.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_binary_body_is_never_read() {
        let mut reply = Reply::ok("image/png", "\u{89}PNG");
        reply.content_length = Some(2048);
        let hop = MockHop::default().with(START, reply);

        let page = fetch_validated(&hop, start().await, &GuardPolicy::unrestricted())
            .await
            .unwrap();

        assert_eq!(page.content.text, "[Binary content (image/png, 2048 bytes) not displayed]");
        assert_eq!(page.bytes, 0);
        assert!(!hop.body_read.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_error_status_is_reported_not_failed() {
        let mut reply = Reply::ok("text/plain", "no such page");
        reply.status = 404;
        let hop = MockHop::default().with(START, reply);

        let result = execute_fetch_url(
            &hop,
            DEFAULT_FETCH_TIMEOUT,
            &fetch_call(START),
            &GuardPolicy::unrestricted(),
        )
        .await;

        assert!(result.is_success());
        assert!(result.text().contains("Status: 404"));
        assert_eq!(result.metadata().status, Some(404));
    }

    #[tokio::test]
    async fn test_metadata_endpoint_rejected_before_any_request() {
        let hop = MockHop::default();
        let result = execute_fetch_url(
            &hop,
            DEFAULT_FETCH_TIMEOUT,
            &fetch_call("http://169.254.169.254/"),
            &GuardPolicy::unrestricted(),
        )
        .await;

        assert_eq!(result.error().unwrap().code, ToolError::VALIDATION_FAILED);
        assert!(result.text().contains("private"));
        assert_eq!(hop.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_network_disabled() {
        let hop = MockHop::default();
        let result = execute_fetch_url(
            &hop,
            DEFAULT_FETCH_TIMEOUT,
            &fetch_call(START),
            &GuardPolicy::disabled(),
        )
        .await;

        assert_eq!(result.error().unwrap().code, ToolError::POLICY_DENIED);
        assert_eq!(hop.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_an_error_result() {
        let result = execute_fetch_url(
            &StalledHop,
            Duration::from_millis(50),
            &fetch_call(START),
            &GuardPolicy::unrestricted(),
        )
        .await;

        assert_eq!(result.error().unwrap().code, ToolError::TIMEOUT);
    }

    #[test]
    fn test_redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(status));
        }
        for status in [200, 304, 404] {
            assert!(!is_redirect(status));
        }
    }
}
