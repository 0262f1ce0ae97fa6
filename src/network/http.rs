//! HTTP network backend built on a blocking ureq agent

use crate::error::{PrecacheError, PrecacheResult};
use crate::network::Network;
use crate::request::{header_value, Headers, Request, Response};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// Largest response body read into memory.
const MAX_BODY_BYTES: u64 = 512 * 1024 * 1024;

/// Real network access
///
/// Requests run on tokio's blocking pool. The agent is configured to hand
/// back 4xx/5xx responses instead of turning them into errors.
#[derive(Clone)]
pub struct HttpNetwork {
    agent: Agent,
    user_agent: String,
}

impl HttpNetwork {
    /// Create an HTTP backend with an optional overall request timeout
    pub fn new(timeout: Option<Duration>, user_agent: &str) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();

        Self {
            agent: Agent::new_with_config(config),
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        let request = request.clone();

        tokio::task::spawn_blocking(move || send(&agent, &request, &user_agent))
            .await
            .map_err(|e| PrecacheError::Internal(format!("network task failed: {}", e)))?
    }

    fn network_name(&self) -> &'static str {
        "http"
    }
}

fn send(agent: &Agent, request: &Request, user_agent: &str) -> PrecacheResult<Response> {
    let url = request.url.as_str();
    debug!("{} {}", request.method, url);

    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(url);

    if !request.headers.contains("user-agent") {
        builder = builder.header("user-agent", user_agent);
    }
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    let result = match &request.body {
        Some(body) => {
            let http_request = builder
                .body(body.clone())
                .map_err(|e| PrecacheError::network(url, e.to_string()))?;
            agent.run(http_request)
        }
        None => {
            let http_request = builder
                .body(())
                .map_err(|e| PrecacheError::network(url, e.to_string()))?;
            agent.run(http_request)
        }
    };
    let mut http_response = result.map_err(|e| PrecacheError::network(url, e.to_string()))?;

    let status = http_response.status().as_u16();
    let mut headers = Headers::new();
    for (name, value) in http_response.headers() {
        headers.append(name.as_str(), header_value(value.as_bytes()));
    }

    let body = http_response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_vec()
        .map_err(|e| PrecacheError::network(url, format!("reading body: {}", e)))?;

    debug!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());

    Ok(Response {
        url: request.url.clone(),
        status,
        headers,
        body,
    })
}
