// Hand-crafted async HTTP client for the ZeroTier One local service API.
//
// Base URL: http://127.0.0.1:9993/
// Auth: X-ZT1-Auth header

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Header carrying the daemon's auth token on every request.
pub const AUTH_HEADER: &str = "X-ZT1-Auth";

/// How much of a rejected body is echoed back in error messages.
const BODY_PREVIEW_LEN: usize = 200;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the daemon's local control API.
///
/// Owns the base address and (through its default headers) the auth token.
/// Never touches any domain state: callers decide what to do with the
/// decoded payloads.
#[derive(Clone)]
pub struct DaemonClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DaemonClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL, the daemon's auth token, and transport config.
    ///
    /// Injects `X-ZT1-Auth` as a sensitive default header on every request.
    pub fn new(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(token.expose_secret().trim())
            .map_err(|e| Error::InvalidToken(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTH_HEADER, value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The daemon base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Generic request ──────────────────────────────────────────────

    /// Issue an arbitrary request and return the decoded JSON body.
    ///
    /// An empty success body decodes to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, Error> {
        let url = self.url(path)?;
        debug!(%method, %url, "daemon request");

        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let text = self.handle_text(path, resp).await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        decode(&text)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let text = self.handle_text(path, resp).await?;
        decode(&text)
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        let text = self.handle_text(path, resp).await?;
        decode(&text)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_text(path, resp).await.map(|_| ())
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_text(&self, path: &str, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.text().await?);
        }

        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(Error::Unauthorized {
                    status: status.as_u16(),
                })
            }
            reqwest::StatusCode::NOT_FOUND => Err(Error::NotFound {
                path: path.trim_start_matches('/').to_owned(),
            }),
            _ => {
                let raw = resp.text().await.unwrap_or_default();
                Err(Error::ServerError {
                    status: status.as_u16(),
                    message: server_message(status, &raw),
                })
            }
        }
    }
}

/// Decode a body, turning schema violations into [`Error::Malformed`].
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
        Error::Malformed {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

/// The daemon reports failures either as `{"error": "..."}` or as bare text.
fn server_message(status: reqwest::StatusCode, raw: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(raw) {
        if let Some(msg) = parsed.error.or(parsed.message) {
            return msg;
        }
    }
    if raw.trim().is_empty() {
        status.to_string()
    } else {
        raw.trim().to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client =
            DaemonClient::from_reqwest("http://127.0.0.1:9993", reqwest::Client::new()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9993/");
        assert_eq!(
            client.url("network/abcdef0123456789").unwrap().as_str(),
            "http://127.0.0.1:9993/network/abcdef0123456789"
        );
    }

    #[test]
    fn nested_base_path_is_kept() {
        let client =
            DaemonClient::from_reqwest("http://localhost:9993/zt", reqwest::Client::new()).unwrap();
        assert_eq!(client.url("/status").unwrap().as_str(), "http://localhost:9993/zt/status");
    }

    #[test]
    fn server_message_prefers_json_error_field() {
        let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(server_message(status, r#"{"error":"boom"}"#), "boom");
        assert_eq!(server_message(status, "plain failure\n"), "plain failure");
        assert_eq!(server_message(status, ""), status.to_string());
    }

    #[test]
    fn decode_reports_malformed_with_body() {
        let err = decode::<Vec<u8>>("<html>").unwrap_err();
        match err {
            Error::Malformed { body, .. } => assert_eq!(body, "<html>"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }
}
