//! HTTP client handed to every task
use crate::error::{RequestError, SwarmError};
use crate::transaction::transaction_hook;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use tracing::trace;
use url::Url;

/// HTTP client bound to the swarm's base host.
///
/// Cloning is cheap and shares the connection pool. Every request goes through the transaction
/// hook, so it is timed and counted under `(method, path)`. Transport errors and statuses of 400
/// and above count as failures and come back as `Err`.
#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
    host: Url,
}

impl Client {
    pub fn new(host: &str) -> Result<Self, SwarmError> {
        let host = Url::parse(host)?;
        let inner = reqwest::Client::builder().build()?;
        Ok(Self { inner, host })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Resolve `path` against the host. Absolute URLs are used as they are.
    pub fn url(&self, path: &str) -> Result<Url, RequestError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        let base = self.host.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            Ok(Url::parse(&format!("{base}{path}"))?)
        } else {
            Ok(Url::parse(&format!("{base}/{path}"))?)
        }
    }

    /// Start a request that can be customized before handing it to [`send`](Self::send).
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RequestError> {
        Ok(self.inner.request(method, self.url(path)?))
    }

    pub async fn get(&self, path: &str) -> Result<Response, RequestError> {
        transaction_hook("GET", path, async {
            let builder = self.request(Method::GET, path)?;
            execute(Method::GET, path, builder).await
        })
        .await
    }

    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<Response, RequestError>
    where
        B: Serialize + ?Sized,
    {
        transaction_hook("POST", path, async {
            let builder = self.request(Method::POST, path)?.json(body);
            execute(Method::POST, path, builder).await
        })
        .await
    }

    /// Send a prepared request, recording it under `(method, name)`.
    pub async fn send(
        &self,
        method: Method,
        name: &str,
        builder: RequestBuilder,
    ) -> Result<Response, RequestError> {
        let kind = method.to_string();
        transaction_hook(&kind, name, execute(method, name, builder)).await
    }
}

async fn execute(
    method: Method,
    name: &str,
    builder: RequestBuilder,
) -> Result<Response, RequestError> {
    let res = builder.send().await?;
    let status = res.status();
    trace!("{method} {name} -> {status}");

    if status.is_client_error() || status.is_server_error() {
        Err(RequestError::Status(status))
    } else {
        Ok(res)
    }
}
