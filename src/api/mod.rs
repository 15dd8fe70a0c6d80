//! Remote API client boundary
//!
//! Commands only see the [`ApiClient`] trait. The dispatcher obtains an
//! instance through an injected factory, so tests swap in a recording fake.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::infrastructure::traits::{HttpRequest, HttpResponse, HttpTransport};
use crate::infrastructure::TransportError;

/// Default API endpoint, used when neither file, environment nor flag sets one.
pub const DEFAULT_ENDPOINT: &str = "https://api.fastly.com";

/// Header carrying the API token.
pub const TOKEN_HEADER: &str = "Fastly-Key";

/// Failure reported by, or while talking to, the remote API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("the Fastly API returned {status}: {message}")]
    Response {
        status: u16,
        message: String,
        detail: Option<String>,
    },

    #[error("cannot reach the Fastly API")]
    Transport(#[from] TransportError),

    #[error("cannot decode API response")]
    Decode(#[from] serde_json::Error),
}

/// Shape of the error body returned by the API.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ErrorBody {
    msg: Option<String>,
    detail: Option<String>,
}

impl ApiError {
    /// Build a `Response` error from a non-success HTTP response.
    ///
    /// Bodies that are not structured JSON keep the raw text as the message.
    pub fn from_response(response: &HttpResponse) -> Self {
        let body: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
        let message = body
            .msg
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| match response.body.trim() {
                "" => "no error message provided".to_string(),
                raw => raw.to_string(),
            });
        Self::Response {
            status: response.status,
            message,
            detail: body.detail.filter(|d| !d.is_empty()),
        }
    }
}

/// Input for creating a Logshuttle logging endpoint.
///
/// `None` fields are omitted from the request entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateLogshuttleInput {
    pub service: String,
    pub version: u32,
    pub name: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub format: Option<String>,
    pub format_version: Option<u32>,
    pub response_condition: Option<String>,
    pub placement: Option<String>,
}

impl CreateLogshuttleInput {
    /// Form fields for the set values, in a stable order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(v) = value {
                fields.push((key, v));
            }
        };
        push("name", self.name.clone());
        push("url", self.url.clone());
        push("token", self.token.clone());
        push("format", self.format.clone());
        push("format_version", self.format_version.map(|v| v.to_string()));
        push("response_condition", self.response_condition.clone());
        push("placement", self.placement.clone());
        fields
    }
}

/// A Logshuttle logging endpoint as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Logshuttle {
    pub name: String,
    pub service_id: String,
    pub version: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub format_version: Option<u32>,
    #[serde(default)]
    pub response_condition: Option<String>,
    #[serde(default)]
    pub placement: Option<String>,
}

/// Operations of the remote API the commands rely on.
pub trait ApiClient: Send {
    fn create_logshuttle(&self, input: &CreateLogshuttleInput) -> Result<Logshuttle, ApiError>;
}

/// `ApiClient` speaking form-encoded HTTP through a transport.
pub struct HttpApiClient {
    token: String,
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
}

impl HttpApiClient {
    pub fn new(token: &str, endpoint: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            token: token.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            transport,
        }
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = request
            .header(TOKEN_HEADER, &self.token)
            .header("Accept", "application/json");
        let response = self.transport.send(&request)?;
        debug!(url = %request.url, status = response.status, "api response");
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(&response))
        }
    }
}

impl ApiClient for HttpApiClient {
    #[instrument(skip(self, input), fields(service = %input.service, version = input.version))]
    fn create_logshuttle(&self, input: &CreateLogshuttleInput) -> Result<Logshuttle, ApiError> {
        let url = format!(
            "{}/service/{}/version/{}/logging/logshuttle",
            self.endpoint, input.service, input.version
        );
        let request = input
            .form_fields()
            .into_iter()
            .fold(HttpRequest::post(url), |req, (k, v)| req.form_field(k, v));
        let response = self.send(request)?;
        Ok(serde_json::from_str(&response.body)?)
    }
}
