//! HTTP-backed [`Connector`] and [`Runner`] for Elasticsearch clusters.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use escli_config::Config;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::executor::{ClusterInfo, Connector, Runner};

const HEADER_REQUEST_ID: &str = "x-request-id";
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Release metadata consulted by `update` unless overridden.
pub const DEFAULT_RELEASE_URL: &str =
    "https://api.github.com/repos/DevopsArtFactory/escli/releases/latest";

/// Version of this build, compared against the latest release.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Transport settings shared by every request of one invocation.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Endpoint returning the latest release as JSON.
    pub release_url: Url,
    /// Value sent in the `x-request-id` header.
    pub request_id: String,
}

impl ConnectOptions {
    /// Options with a fresh request identifier.
    #[must_use]
    pub fn new(timeout: Duration, release_url: Url) -> Self {
        Self {
            timeout,
            release_url,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Connects to the cluster named by the configuration over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    options: ConnectOptions,
}

impl HttpConnector {
    /// Connector using `options` for every runner it builds.
    #[must_use]
    pub const fn new(options: ConnectOptions) -> Self {
        Self { options }
    }

    fn client(&self) -> anyhow::Result<Client> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(&self.options.request_id)
            .map_err(|_| anyhow!("request identifier contains invalid characters"))?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        Client::builder()
            .timeout(self.options.timeout)
            .default_headers(default_headers)
            .user_agent(format!("escli/{CURRENT_VERSION}"))
            .build()
            .context("failed to build HTTP client")
    }
}

#[derive(Debug, Deserialize)]
struct Handshake {
    cluster_name: String,
    version: HandshakeVersion,
}

#[derive(Debug, Deserialize)]
struct HandshakeVersion {
    number: String,
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, config: &Config) -> anyhow::Result<Arc<dyn Runner>> {
        let base = base_url(config.endpoint()?);
        let client = self.client()?;

        debug!(endpoint = %base, request_id = %self.options.request_id, "connecting");
        let response = client
            .get(base.clone())
            .send()
            .await
            .with_context(|| format!("request to {base} failed"))?;
        let handshake: Handshake = ensure_success(response)
            .await?
            .json()
            .await
            .context("cluster handshake returned an unexpected body")?;

        Ok(Arc::new(ClusterRunner {
            client,
            base,
            release_url: self.options.release_url.clone(),
            cluster: ClusterInfo {
                name: handshake.cluster_name,
                version: handshake.version.number,
            },
        }))
    }
}

/// Runner issuing `_cat` queries against one cluster.
#[derive(Debug)]
pub struct ClusterRunner {
    client: Client,
    base: Url,
    release_url: Url,
    cluster: ClusterInfo,
}

impl ClusterRunner {
    async fn cat(&self, api: &str, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
        let url = self
            .base
            .join(&format!("_cat/{api}?v=true"))
            .with_context(|| format!("invalid _cat path for {api}"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("_cat/{api} request failed"))?;
        let response = ensure_success(response).await?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("failed to read _cat/{api} response"))?;
            out.write_all(&chunk)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    html_url: Option<String>,
}

#[async_trait]
impl Runner for ClusterRunner {
    fn cluster(&self) -> &ClusterInfo {
        &self.cluster
    }

    async fn cat_indices(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
        self.cat("indices", out).await
    }

    async fn cat_nodes(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
        self.cat("nodes", out).await
    }

    async fn cat_health(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
        self.cat("health", out).await
    }

    async fn update(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
        let response = self
            .client
            .get(self.release_url.clone())
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .context("release check failed")?;
        let release: Release = ensure_success(response)
            .await?
            .json()
            .await
            .context("release metadata was not recognised")?;

        debug!(latest = %release.tag_name, current = CURRENT_VERSION, "release check");
        if is_newer(&release.tag_name, CURRENT_VERSION) {
            let latest = &release.tag_name;
            writeln!(out, "a newer escli release is available: {latest}")?;
            if let Some(url) = release.html_url {
                writeln!(out, "download: {url}")?;
            }
        } else {
            writeln!(out, "escli v{CURRENT_VERSION} is up to date")?;
        }
        Ok(())
    }

    /// Nothing is held beyond the HTTP client; its connection pool is freed
    /// when the factory drops this runner.
    async fn close(&self) {
        debug!(cluster = %self.cluster.name, "releasing cluster session");
    }
}

fn base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured {
        #[serde(rename = "type")]
        kind: String,
        reason: String,
    },
    Plain(String),
}

async fn ensure_success(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let bytes = response.bytes().await.unwrap_or_default();
    let message = match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(ErrorBody {
            error: ErrorDetail::Structured { kind, reason },
        }) => format!("{kind}: {reason}"),
        Ok(ErrorBody {
            error: ErrorDetail::Plain(reason),
        }) => reason,
        Err(_) => String::from_utf8_lossy(&bytes).trim().to_string(),
    };
    if message.is_empty() {
        Err(anyhow!("request failed with status {status}"))
    } else {
        Err(anyhow!("{message} (status {status})"))
    }
}

fn version_parts(version: &str) -> Vec<u64> {
    version
        .trim()
        .trim_start_matches('v')
        .split(['.', '-', '+'])
        .map_while(|part| part.parse().ok())
        .collect()
}

fn is_newer(candidate: &str, current: &str) -> bool {
    version_parts(candidate) > version_parts(current)
}
