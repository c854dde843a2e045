//! HTTP plumbing shared by the device and suggestion clients

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};

use powerflow_auth::{backend_error_message, SessionContext};

use crate::error::{Error, Result};

/// Base URL, HTTP client and session for the `/api` endpoints
#[derive(Debug, Clone)]
pub struct Gateway {
    base_url: String,
    client: Client,
    session: SessionContext,
}

impl Gateway {
    pub fn new(base_url: &str, client: Client, session: SessionContext) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::GET, path)
    }

    pub fn post(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::POST, path)
    }

    pub fn put(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::DELETE, path)
    }
}

/// Helper for building and executing a single request
pub struct FetchBuilder<'a> {
    gateway: &'a Gateway,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    authenticated: bool,
}

impl<'a> FetchBuilder<'a> {
    fn new(gateway: &'a Gateway, method: Method, path: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            gateway,
            method,
            url: gateway.url(path),
            headers,
            body: None,
            authenticated: false,
        }
    }

    /// Send the session token as a bearer credential
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    fn build(&self) -> Result<RequestBuilder> {
        let url = url::Url::parse(&self.url)?;
        let mut headers = self.headers.clone();

        if self.authenticated {
            let token = self.gateway.session.token().ok_or(Error::NotLoggedIn)?;
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::malformed("session token is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut req = self
            .gateway
            .client
            .request(self.method.clone(), url)
            .headers(headers);
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        Ok(req)
    }

    /// Send the request and turn error statuses into [`Error`]s
    ///
    /// A 401 tears the shared session down before returning
    /// [`Error::Unauthorized`].
    pub async fn send(&self) -> Result<Response> {
        let response = self.build()?.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            log::warn!("{} {} answered 401, ending session", self.method, self.url);
            self.gateway.session.teardown();
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = backend_error_message(&body);
            log::debug!("{} {} failed with {}: {}", self.method, self.url, status, message);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Send and decode the body as `T`
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.send().await?.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("{} {}: {}", self.method, self.url, e)))
    }

    /// Send and decode the body as untyped JSON; an empty body is `null`
    pub async fn execute_value(&self) -> Result<serde_json::Value> {
        let body = self.send().await?.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("{} {}: {}", self.method, self.url, e)))
    }
}
