//! HTTP transport for the PuppetDB API
//!
//! Issues GET requests against `<base_url>/<api-root>/<path>` and hands back
//! the decoded JSON body untyped. Type narrowing is the resource client's job.

use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Certificate, Client, Identity};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::PuppetDbConfig;
use crate::utils::error::{PuppetDbError, Result};

/// API roots served by PuppetDB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRoot {
    /// `pdb/query/v4`
    Query,
    /// `metrics/v1`
    Metrics,
}

impl ApiRoot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiRoot::Query => "pdb/query/v4",
            ApiRoot::Metrics => "metrics/v1",
        }
    }
}

/// Sort direction for `order_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One entry of the `order_by` parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: SortOrder::Desc,
        }
    }
}

/// Query-string parameters, each value already serialized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    /// JSON-serialized AST
    pub query: Option<String>,
    /// Maximum number of results to return
    pub limit: Option<u32>,
    /// Number of results to skip
    pub offset: Option<u32>,
    /// JSON-serialized `[{field, order}]` array
    pub order_by: Option<String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach query text as-is
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, order: &[OrderBy]) -> Self {
        self.order_by = serde_json::to_string(order).ok();
        self
    }

    /// Parameters as name/value pairs, in a stable order
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![];
        if let Some(ref query) = self.query {
            params.push(("query", query.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(ref order_by) = self.order_by {
            params.push(("order_by", order_by.clone()));
        }
        params
    }

    /// Look up a parameter value by name
    pub fn get(&self, name: &str) -> Option<String> {
        self.pairs()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    fn to_query_string(&self) -> String {
        let params: Vec<String> = self
            .pairs()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(&value)))
            .collect();
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Executes a single GET against the inventory service
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET <base>/<root>/<path>?<params>`, decoded as JSON
    async fn execute(&self, root: ApiRoot, path: &str, params: &QueryParams) -> Result<Value>;
}

/// Check if an SSL file exists and is readable, logging the result
fn check_ssl_file_access(path: &Path, file_type: &str) -> AnyResult<()> {
    let metadata = fs::metadata(path).with_context(|| {
        let msg = format!(
            "PuppetDB SSL ERROR: Cannot access {} file: {}",
            file_type,
            path.display()
        );
        error!("{}", msg);
        msg
    })?;

    if !metadata.is_file() {
        let msg = format!(
            "PuppetDB SSL ERROR: {} path is not a regular file: {}",
            file_type,
            path.display()
        );
        error!("{}", msg);
        anyhow::bail!(msg);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        debug!(
            "{} file permissions: mode={:o}, uid={}, gid={}, path={}",
            file_type,
            metadata.mode() & 0o777,
            metadata.uid(),
            metadata.gid(),
            path.display()
        );
    }

    Ok(())
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a new transport with optional SSL/TLS configuration
    pub fn new(config: &PuppetDbConfig) -> AnyResult<Self> {
        let url = config.effective_url();
        info!("Initializing PuppetDB transport for {}", url);

        let mut builder = Client::builder();

        // No client-side deadline unless one is configured
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        // CA must be loaded before the identity for rustls
        if let Some(ca_path) = config.effective_ssl_ca() {
            check_ssl_file_access(ca_path, "CA certificate")?;

            let ca_cert = fs::read(ca_path)
                .with_context(|| format!("Failed to read CA certificate: {:?}", ca_path))?;

            // The CA file may contain a chain
            let certs = Certificate::from_pem_bundle(&ca_cert)
                .context("Failed to parse CA certificate(s) as PEM")?;

            info!(
                "PuppetDB SSL: Parsed {} certificate(s) from CA bundle",
                certs.len()
            );

            // Only trust the Puppet CA, not system CAs
            builder = builder.tls_certs_only(std::iter::empty());
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        match (config.effective_ssl_cert(), config.effective_ssl_key()) {
            (Some(cert_path), Some(key_path)) => {
                check_ssl_file_access(cert_path, "Client certificate")?;
                check_ssl_file_access(key_path, "Client private key")?;

                let cert = fs::read(cert_path).with_context(|| {
                    format!("Failed to read client certificate: {:?}", cert_path)
                })?;
                let key = fs::read(key_path)
                    .with_context(|| format!("Failed to read client key: {:?}", key_path))?;

                // rustls wants cert and key in a single PEM bundle
                let mut pem_bundle = cert;
                pem_bundle.push(b'\n');
                pem_bundle.extend_from_slice(&key);

                let identity = Identity::from_pem(&pem_bundle)
                    .context("Failed to create identity from certificate and key")?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            (cert, key) => {
                warn!(
                    "Partial SSL configuration: cert={:?}, key={:?}. Both must be provided for client authentication.",
                    cert.is_some(),
                    key.is_some()
                );
            }
        }

        if !config.effective_ssl_verify() {
            warn!("SSL certificate verification is DISABLED - this is insecure!");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, root: ApiRoot, path: &str, params: &QueryParams) -> String {
        format!(
            "{}/{}/{}{}",
            self.base_url,
            root.as_str(),
            path.trim_start_matches('/'),
            params.to_query_string()
        )
    }

    /// Handle HTTP response and parse JSON
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(|e| {
                PuppetDbError::network(format!("Failed to read response body: {}", e))
            })?;
            serde_json::from_str::<Value>(&body).map_err(|e| {
                let truncated = if body.chars().count() > 500 {
                    format!("{}... (truncated)", body.chars().take(500).collect::<String>())
                } else {
                    body
                };
                PuppetDbError::Decode(format!(
                    "Failed to parse response JSON ({}): {}",
                    e, truncated
                ))
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                "PuppetDB returned an error response: {}", body
            );
            Err(PuppetDbError::http_status(
                status.as_u16(),
                status.canonical_reason(),
                body,
            ))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, root: ApiRoot, path: &str, params: &QueryParams) -> Result<Value> {
        let url = self.url_for(root, path, params);
        debug!("PuppetDB: Sending GET request to {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("PuppetDB ERROR: HTTP request failed to {}: {}", url, e);
                error!(
                    "PuppetDB ERROR: Error flags - is_connect: {}, is_timeout: {}, is_request: {}",
                    e.is_connect(),
                    e.is_timeout(),
                    e.is_request()
                );

                // Walk through error chain for root cause
                let mut cause = e.to_string();
                let mut current: Option<&dyn StdError> = e.source();
                while let Some(source) = current {
                    error!("PuppetDB ERROR: Caused by: {}", source);
                    cause.push_str(": ");
                    cause.push_str(&source.to_string());
                    current = source.source();
                }

                if e.is_connect() {
                    error!("PuppetDB ERROR: Connection failed. Check the PuppetDB URL, network access and SSL certificates");
                }
                PuppetDbError::network(cause)
            })?;

        self.handle_response(response).await
    }
}
