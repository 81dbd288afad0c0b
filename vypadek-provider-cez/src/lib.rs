//! Fetcher implementation for the ČEZ distribuce outage lookup API ("bezstavy").

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder};
use tracing::warn;

use vypadek_core::{
    config::{ConfigError, HttpMethod, OutageConfig, RequestTemplate},
    model::{AddressQuery, OutagePayload},
    pool::AddressPool,
    ports::{FetchResult, OutagePort},
};

const USER_AGENT: &str = concat!("vypadek/", env!("CARGO_PKG_VERSION"));

/// Outage lookup for a single address.
pub struct CezOutagePort {
    client: Client,
    query: AddressQuery,
    method: Method,
    url: String,
    body: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl CezOutagePort {
    /// Create a port for `query` bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, template: &RequestTemplate, query: AddressQuery) -> Self {
        Self {
            client,
            method: method(template.method),
            url: template.resolve_url(&query),
            body: template.body().map(str::to_owned),
            username: template.username.clone(),
            password: template.password.clone(),
            query,
        }
    }

    fn request(&self) -> RequestBuilder {
        let mut req = self.client.request(self.method.clone(), &self.url);

        if let Some(body) = &self.body {
            req = req
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        if let Some(username) = &self.username {
            req = req.basic_auth(username, self.password.as_ref());
        }

        req
    }
}

#[async_trait]
impl OutagePort for CezOutagePort {
    fn query(&self) -> &AddressQuery {
        &self.query
    }

    fn describe(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    async fn fetch(&self) -> FetchResult {
        fetch_payload(self.request()).await
    }
}

/// Build the HTTP client shared by all ports of one monitor.
///
/// Timeout and TLS verification come from the request template.
///
/// # Errors
///
/// Returns a [`reqwest::Error`] when the TLS backend cannot be initialised.
pub fn build_client(template: &RequestTemplate) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(template.timeout())
        .danger_accept_invalid_certs(!template.verify_ssl)
        .build()
}

/// One port per configured address, in configured order.
#[must_use]
pub fn ports(client: &Client, config: &OutageConfig) -> Vec<Arc<dyn OutagePort>> {
    config
        .address_queries()
        .into_iter()
        .map(|query| {
            Arc::new(CezOutagePort::new(client.clone(), &config.request, query))
                as Arc<dyn OutagePort>
        })
        .collect()
}

/// Build the address pool for a validated configuration.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the configuration names no street.
pub fn pool(client: &Client, config: &OutageConfig) -> Result<AddressPool, ConfigError> {
    Ok(AddressPool::new(ports(client, config))?.with_max_concurrent(config.max_concurrent()))
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
    }
}

// The upstream answers JSON with error statuses now and then, so only transport and
// decoding failures count.
async fn fetch_payload(req: RequestBuilder) -> FetchResult {
    let response = req.send().await?;

    let status = response.status();
    if !status.is_success() {
        warn!(%status, url = %response.url(), "outage lookup answered with an error status");
    }

    let body = response.text().await?;
    Ok(OutagePayload::from_json(&body)?)
}
