//! Authenticated JSON client for the remote API.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::error::{ApiFailure, CallError, CallResult, ErrorKind, HttpFailure};
use crate::resilience::{CallOptions, ResilientExecutor};

const USER_AGENT: &str = concat!("resilient-call/", env!("CARGO_PKG_VERSION"));

/// Failure of a single request attempt.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Connection, TLS, timeout or body decoding error.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{0}")]
    Status(HttpFailure),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiFailure for RequestFailure {
    fn status_code(&self) -> Option<u16> {
        match self {
            RequestFailure::Transport(e) => ApiFailure::status_code(e),
            RequestFailure::Status(f) => f.status,
            RequestFailure::InvalidUrl(_) => None,
        }
    }

    fn message(&self) -> String {
        match self {
            RequestFailure::Transport(e) => ApiFailure::message(e),
            other => other.to_string(),
        }
    }
}

/// JSON client whose every request runs through a shared [`ResilientExecutor`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    executor: Arc<ResilientExecutor>,
}

impl ApiClient {
    pub fn new(base_url: &str, executor: Arc<ResilientExecutor>) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
            executor,
        })
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn executor(&self) -> &Arc<ResilientExecutor> {
        &self.executor
    }

    /// Resolve `path` against the base URL. Leading slashes are ignored.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T>(
        &self,
        operation: &str,
        path: &str,
    ) -> CallResult<T, RequestFailure>
    where
        T: DeserializeOwned,
    {
        let options = self.executor.options(operation);
        self.get_json_with(path, &options).await
    }

    pub async fn get_json_with<T>(
        &self,
        path: &str,
        options: &CallOptions,
    ) -> CallResult<T, RequestFailure>
    where
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        self.executor
            .execute(
                || {
                    let request = self.request(Method::GET, url.clone());
                    async move {
                        let response = check_status(request.send().await?).await?;
                        Ok::<T, RequestFailure>(response.json::<T>().await?)
                    }
                },
                options,
            )
            .await
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    pub async fn post_json<B, T>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> CallResult<T, RequestFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        let options = self.executor.options(operation);
        self.executor
            .execute(
                || {
                    let request = self.request(Method::POST, url.clone()).json(body);
                    async move {
                        let response = check_status(request.send().await?).await?;
                        Ok::<T, RequestFailure>(response.json::<T>().await?)
                    }
                },
                &options,
            )
            .await
    }

    /// DELETE `path`, ignoring any response body.
    pub async fn delete(&self, operation: &str, path: &str) -> CallResult<(), RequestFailure> {
        let url = self.resolve(path)?;
        let options = self.executor.options(operation);
        self.executor
            .execute(
                || {
                    let request = self.request(Method::DELETE, url.clone());
                    async move {
                        check_status(request.send().await?).await?;
                        Ok::<(), RequestFailure>(())
                    }
                },
                &options,
            )
            .await
    }

    fn resolve(&self, path: &str) -> CallResult<Url, RequestFailure> {
        self.endpoint(path).map_err(|e| CallError::Upstream {
            kind: ErrorKind::General,
            source: RequestFailure::InvalidUrl(e),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self
            .http
            .request(method, url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Turn a non-success response into a [`RequestFailure::Status`].
async fn check_status(response: Response) -> Result<Response, RequestFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        body
    };
    Err(RequestFailure::Status(HttpFailure::new(status.as_u16(), message)))
}
