//! Client for RESTful handlers served by cascade-dispatch.
//!
//! Responses use the `{success, data, error}` envelope. Requests can be
//! signed by an injected [`Signer`]: the signature covers
//! `METHOD + host + path + raw body` and travels as basic auth
//! `token:signature`.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Produces request signatures. The algorithm (HMAC or otherwise) is up to
/// the implementor.
pub trait Signer: Send + Sync {
    /// Public identifier of the signing key.
    fn token(&self) -> &str;

    /// Signature of `message`.
    fn sign(&self, message: &[u8]) -> String;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered with `success: false`.
    #[error("api error: {0}")]
    Api(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Response envelope of RESTful handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// `data` on success, the server's message otherwise.
    pub fn into_result(self) -> Result<Value, ClientError> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(ClientError::Api(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

pub struct ApiClient {
    client: Client,
    base: Url,
    signer: Option<Arc<dyn Signer>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::new(),
            base: Url::parse(base_url)?,
            signer: None,
        })
    }

    /// Sign every request with `signer`.
    pub fn with_signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    /// `GET path`, unwrapping the envelope.
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path)?;
        self.send(Method::GET, url, None).await
    }

    /// `POST path` with a urlencoded form, unwrapping the envelope.
    pub async fn post_form(&self, path: &str, pairs: &[(&str, &str)]) -> Result<Value, ClientError> {
        let url = self.url(path)?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.send(Method::POST, url, Some(body)).await
    }

    async fn send(&self, method: Method, url: Url, body: Option<String>) -> Result<Value, ClientError> {
        let mut req = self.client.request(method.clone(), url.clone());

        if let Some(signer) = &self.signer {
            let message = signing_message(&method, &url, body.as_deref().unwrap_or(""));
            req = req.basic_auth(signer.token(), Some(signer.sign(message.as_bytes())));
        }
        if let Some(body) = body {
            req = req
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Message covered by the signature: method, host (with port), path, raw body.
pub fn signing_message(method: &Method, url: &Url, body: &str) -> String {
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    format!("{}{}{}{}", method.as_str(), host, url.path(), body)
}
