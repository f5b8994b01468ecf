//! Alibaba Cloud RPC API client
//!
//! Every product (VPC, RDS) speaks the same RPC dialect: a signed POST to
//! `/` with the action parameters in the query string and a JSON answer.
//! [`RpcApi`] is the seam between the services and the wire; [`AliyunClient`]
//! is the real implementation.

use crate::error::{AlicloudError, Result};
use crate::signer;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Wait used after a create
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Wait used after a delete
pub const DEFAULT_TIMEOUT_MEDIUM: Duration = Duration::from_secs(500);
/// Status polling interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

pub const PAGE_SIZE_LARGE: usize = 50;
pub const PAGE_SIZE_XLARGE: usize = 100;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Cloud product an action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Vpc,
    Rds,
}

impl Product {
    /// API version sent in `x-acs-version`
    pub fn version(&self) -> &'static str {
        match self {
            Product::Vpc => "2016-04-28",
            Product::Rds => "2014-08-15",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Product::Vpc => "https://vpc.aliyuncs.com",
            Product::Rds => "https://rds.aliyuncs.com",
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Product::Vpc => write!(f, "vpc"),
            Product::Rds => write!(f, "rds"),
        }
    }
}

/// Access key pair, optionally with an STS token
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: None,
        }
    }

    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("security_token", &self.security_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    pub credentials: Credentials,
    /// Per-product endpoint overrides, scheme included
    pub endpoints: HashMap<Product, String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            region: region.into(),
            credentials,
            endpoints: HashMap::new(),
            timeout: HTTP_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, product: Product, endpoint: impl Into<String>) -> Self {
        self.endpoints.insert(product, endpoint.into());
        self
    }

    /// Endpoint for `product`; bare host names get `https://`
    pub fn endpoint(&self, product: Product) -> String {
        let endpoint = self
            .endpoints
            .get(&product)
            .map(String::as_str)
            .unwrap_or_else(|| product.default_endpoint());
        if endpoint.contains("://") {
            endpoint.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", endpoint.trim_end_matches('/'))
        }
    }
}

/// Transport for RPC style API calls
#[async_trait]
pub trait RpcApi: Send + Sync {
    /// Region requests are scoped to
    fn region(&self) -> &str;

    /// Invoke `action` and return the decoded JSON body
    async fn invoke(
        &self,
        product: Product,
        action: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Value>;
}

/// Error body returned with a non-2xx status
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ApiErrorBody {
    code: String,
    message: String,
    request_id: String,
}

/// HTTP implementation of [`RpcApi`]
pub struct AliyunClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AliyunClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.credentials.access_key_id.is_empty()
            || config.credentials.access_key_secret.is_empty()
        {
            return Err(AlicloudError::MissingCredentials(
                "access key id and secret must both be set".to_string(),
            ));
        }
        if config.region.is_empty() {
            return Err(AlicloudError::InvalidConfig("region must be set".to_string()));
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl RpcApi for AliyunClient {
    fn region(&self) -> &str {
        &self.config.region
    }

    #[tracing::instrument(skip(self, params), fields(region = %self.config.region))]
    async fn invoke(
        &self,
        product: Product,
        action: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Value> {
        let endpoint = self.config.endpoint(product);
        let url = reqwest::Url::parse(&format!("{}/", endpoint))
            .map_err(|e| {
                AlicloudError::InvalidConfig(format!("invalid endpoint {}: {}", endpoint, e))
            })?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => {
                return Err(AlicloudError::InvalidConfig(format!(
                    "endpoint {} has no host",
                    endpoint
                )));
            }
        };

        let query = signer::canonical_query(&params);
        let body: &[u8] = b"";
        let credentials = &self.config.credentials;

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host);
        headers.insert("x-acs-action".to_string(), action.to_string());
        headers.insert("x-acs-version".to_string(), product.version().to_string());
        headers.insert(
            "x-acs-date".to_string(),
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        headers.insert(
            "x-acs-signature-nonce".to_string(),
            uuid::Uuid::new_v4().simple().to_string(),
        );
        headers.insert("x-acs-content-sha256".to_string(), signer::hex_sha256(body));
        if let Some(token) = &credentials.security_token {
            headers.insert("x-acs-security-token".to_string(), token.clone());
        }

        let authorization = signer::authorization(
            &credentials.access_key_id,
            &credentials.access_key_secret,
            "POST",
            &query,
            &headers,
            body,
        )?;

        let target = if query.is_empty() {
            url.to_string()
        } else {
            format!("{}?{}", url, query)
        };

        let mut request = self
            .http
            .post(&target)
            .header("Authorization", authorization)
            .header("Accept", "application/json");
        for (name, value) in &headers {
            // reqwest derives Host from the URL
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        tracing::debug!(%product, action, "Invoking API");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let code = if body.code.is_empty() {
                status.as_u16().to_string()
            } else {
                body.code
            };
            let message = if body.message.is_empty() { text } else { body.message };
            tracing::debug!(%product, action, %code, "API returned an error");
            return Err(AlicloudError::Api {
                action: action.to_string(),
                code,
                message,
                request_id: body.request_id,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Transport that refuses every call
///
/// Lets schemas be inspected and declarations validated without credentials.
pub struct OfflineApi {
    region: String,
}

impl OfflineApi {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

#[async_trait]
impl RpcApi for OfflineApi {
    fn region(&self) -> &str {
        &self.region
    }

    async fn invoke(
        &self,
        _product: Product,
        action: &str,
        _params: BTreeMap<String, String>,
    ) -> Result<Value> {
        Err(AlicloudError::MissingCredentials(format!(
            "{} needs credentials, but the provider was built offline",
            action
        )))
    }
}

/// A typed RPC request
pub trait RpcRequest {
    const PRODUCT: Product;
    const ACTION: &'static str;
    type Response: DeserializeOwned;

    /// Action parameters; `RegionId` is filled in by [`call`] when missing
    fn params(&self) -> BTreeMap<String, String>;
}

/// Send a typed request and decode its response
pub async fn call<R: RpcRequest>(api: &dyn RpcApi, request: &R) -> Result<R::Response> {
    let mut params = request.params();
    params
        .entry("RegionId".to_string())
        .or_insert_with(|| api.region().to_string());

    let value = api.invoke(R::PRODUCT, R::ACTION, params).await?;
    tracing::debug!(action = R::ACTION, response = %value, "API response");

    serde_json::from_value(value).map_err(|e| AlicloudError::UnexpectedResponse {
        action: R::ACTION.to_string(),
        message: e.to_string(),
    })
}

/// Builder for request parameters
#[derive(Debug, Default, Clone)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    /// Set only when `value` is not empty
    pub fn set_non_empty(self, key: &str, value: &str) -> Self {
        if value.is_empty() { self } else { self.set(key, value) }
    }

    pub fn build(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Idempotency token for create calls: `TF-<action>-<unix>-<uuid>`, at most 64 chars
pub fn build_client_token(action: &str) -> String {
    let token = format!(
        "TF-{}-{}-{}",
        action,
        Utc::now().timestamp(),
        uuid::Uuid::new_v4().simple()
    );
    token.chars().take(64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_token() {
        let token = build_client_token("CreateVpc");
        assert!(token.starts_with("TF-CreateVpc-"));
        assert!(token.len() <= 64);
        assert!(!token.contains(' '));
        assert_ne!(token, build_client_token("CreateVpc"));

        let long = build_client_token(&"A".repeat(80));
        assert_eq!(long.len(), 64);
    }

    #[test]
    fn test_endpoint_resolution() {
        let config = ClientConfig::new("cn-hangzhou", Credentials::new("id", "secret"))
            .with_endpoint(Product::Rds, "http://127.0.0.1:8080/")
            .with_endpoint(Product::Vpc, "vpc.cn-hangzhou.aliyuncs.com");

        assert_eq!(config.endpoint(Product::Rds), "http://127.0.0.1:8080");
        assert_eq!(config.endpoint(Product::Vpc), "https://vpc.cn-hangzhou.aliyuncs.com");

        let plain = ClientConfig::new("cn-hangzhou", Credentials::new("id", "secret"));
        assert_eq!(plain.endpoint(Product::Vpc), "https://vpc.aliyuncs.com");
        assert_eq!(Product::Rds.version(), "2014-08-15");
    }

    #[test]
    fn test_client_requires_credentials() {
        let config = ClientConfig::new("cn-hangzhou", Credentials::new("", ""));
        assert!(matches!(
            AliyunClient::new(config),
            Err(AlicloudError::MissingCredentials(_))
        ));

        let config = ClientConfig::new("", Credentials::new("id", "secret"));
        assert!(matches!(
            AliyunClient::new(config),
            Err(AlicloudError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_api_refuses_calls() {
        let api = OfflineApi::new("cn-shanghai");
        assert_eq!(api.region(), "cn-shanghai");
        let err = api
            .invoke(Product::Vpc, "DescribeVpcs", BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AlicloudError::MissingCredentials(_)));
        assert!(err.to_string().contains("DescribeVpcs"));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let credentials = Credentials::new("LTAI", "topsecret").with_security_token("sts");
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("LTAI"));
        assert!(!printed.contains("topsecret"));
        assert!(!printed.contains("sts\""));
    }

    #[test]
    fn test_params_skip_empty() {
        let params = Params::new()
            .set("CidrBlock", "10.0.0.0/8")
            .set_non_empty("VpcName", "")
            .set("PageSize", 50)
            .build();
        assert_eq!(params.len(), 2);
        assert_eq!(params["PageSize"], "50");
    }
}
