//! Shared HTTP transport.
//!
//! One base client is built up front and reused. Settings that carry a proxy get
//! a freshly built client for that call, so the base client is never touched.

use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Response};

use crate::config::{HttpConfig, ProviderProxy};
use crate::error::{ProviderError, ProviderResult};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> ProviderResult<Self> {
        let client = Self::builder(&config)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn builder(config: &HttpConfig) -> ClientBuilder {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        builder
    }

    /// Client to use for a call made through `proxy`
    pub fn client_for(&self, proxy: &ProviderProxy) -> ProviderResult<Client> {
        match proxy {
            ProviderProxy::None => Ok(self.client.clone()),
            ProviderProxy::Http {
                address,
                port,
                username,
                password,
            } => {
                let mut proxy = reqwest::Proxy::all(format!("http://{address}:{port}"))
                    .map_err(|e| ProviderError::Configuration(format!("Invalid proxy URL: {e}")))?;
                if let Some(username) = username.as_deref().filter(|u| !u.is_empty()) {
                    proxy = proxy.basic_auth(username, password.as_deref().unwrap_or_default());
                }
                Self::builder(&self.config)
                    .proxy(proxy)
                    .build()
                    .map_err(|e| ProviderError::Configuration(format!("Failed to build proxied HTTP client: {e}")))
            }
        }
    }

    pub async fn post(
        &self,
        proxy: &ProviderProxy,
        url: &str,
        headers: HeaderMap,
        body: String,
    ) -> ProviderResult<Response> {
        let resp = self
            .client_for(proxy)?
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(resp)
    }

    pub async fn get(&self, proxy: &ProviderProxy, url: &str, headers: HeaderMap) -> ProviderResult<Response> {
        let resp = self.client_for(proxy)?.get(url).headers(headers).send().await?;
        Ok(resp)
    }
}

/// Turn a non-success response into [`ProviderError::UnexpectedStatus`]
pub async fn ensure_success(resp: Response) -> ProviderResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .ok()
        .filter(|body| !body.is_empty())
        .unwrap_or_else(|| "Unknown error".to_string());
    tracing::warn!(status = status.as_u16(), "vendor rejected request");
    Err(ProviderError::UnexpectedStatus(status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_transport() {
        assert!(HttpTransport::new(HttpConfig::default()).is_ok());
    }

    #[test]
    fn builds_proxied_client() {
        let transport = HttpTransport::new(HttpConfig {
            timeout_secs: Some(30),
            ..Default::default()
        })
        .unwrap();
        let proxy = ProviderProxy::Http {
            address: "127.0.0.1".into(),
            port: 8080,
            username: Some("user".into()),
            password: None,
        };
        assert!(transport.client_for(&proxy).is_ok());
        assert!(transport.client_for(&ProviderProxy::None).is_ok());
    }
}
