use std::time::Duration;

use arangodb_core::{ClientConfig, Error, Method, Request, Response, Result, Transport};
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::debug;

/// reqwest-backed transport bound to one database
pub struct HttpTransport {
    client: HttpClient,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(Error::transport)?;

        Ok(Self {
            client,
            base_url: config.database_url(),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Decode a response body; non-JSON payloads are kept as a string
fn decode_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    async fn send(&self, request: Request) -> Result<Response> {
        let url = format!("{}{}", self.base_url, request.endpoint);

        let mut builder = self
            .client
            .request(http_method(request.method), &url)
            .query(&request.params);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, password.as_ref());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(Error::transport)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(Error::transport)?;

        debug!(status, bytes = text.len(), "response received");
        Ok(Response::new(status, decode_body(text)))
    }
}
