//! HTTP plumbing of the S3 adapter

use pollen_common::{BackendKind, Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the HTTP client owned by one adapter
pub(crate) fn build_client(kind: BackendKind) -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| Error::configuration(format!("{kind}: failed to build HTTP client: {e}")))
}

/// Map a transport failure to a status-less backend error
pub(crate) fn transport_error(kind: BackendKind, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::backend(kind, None, "request timed out")
    } else {
        Error::backend(kind, None, err.to_string())
    }
}

/// Send a request; non-2xx responses become `Error::Backend`
///
/// `describe` turns a provider error body into `Code: Message`.
pub(crate) async fn send(
    kind: BackendKind,
    request: RequestBuilder,
    describe: fn(&str) -> Option<String>,
) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(kind, &e))?;

    let status = response.status();
    debug!("{} {} -> {}", kind, response.url().path(), status.as_u16());
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = describe(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });
    Err(Error::backend(kind, Some(status.as_u16()), message))
}

/// Drain a response body into one owned buffer
pub(crate) async fn read_body(kind: BackendKind, response: Response) -> Result<bytes::Bytes> {
    response.bytes().await.map_err(|e| transport_error(kind, &e))
}

/// Drain a response body as text
pub(crate) async fn read_text(kind: BackendKind, response: Response) -> Result<String> {
    response.text().await.map_err(|e| transport_error(kind, &e))
}
