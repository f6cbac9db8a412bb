//! Server address and credential placement.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use url::Url;

use crate::error::{ChatError, ChatResult};

/// Route the chat server mounts its WebSocket on.
pub const CHAT_PATH: &str = "/ws/chat";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the bearer credential travels during the handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPlacement {
    /// `?token=<credential>` on the connection URL.
    #[default]
    Query,
    /// `Authorization: Bearer <credential>` header.
    Header,
}

/// Everything needed to open one connection.
#[derive(Clone)]
pub struct Endpoint {
    url: Url,
    token: Option<String>,
    auth: AuthPlacement,
    connect_timeout: Duration,
}

impl Endpoint {
    /// Parse a `ws://` or `wss://` address. A bare host gets the chat route.
    pub fn new(address: &str) -> ChatResult<Self> {
        let mut url =
            Url::parse(address).map_err(|e| ChatError::Endpoint(format!("{address}: {e}")))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ChatError::Endpoint(format!(
                    "unsupported scheme `{other}`, expected ws or wss"
                )));
            }
        }
        if url.host_str().is_none() {
            return Err(ChatError::Endpoint(format!("{address}: missing host")));
        }
        if url.path() == "/" || url.path().is_empty() {
            url.set_path(CHAT_PATH);
        }
        Ok(Self {
            url,
            token: None,
            auth: AuthPlacement::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthPlacement) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn auth(&self) -> AuthPlacement {
        self.auth
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// URL actually dialed. With query placement any existing `token`
    /// parameter is replaced and other parameters are kept in order.
    pub fn request_url(&self) -> Url {
        let mut url = self.url.clone();
        if let (Some(token), AuthPlacement::Query) = (&self.token, self.auth) {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != "token")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair("token", token);
        }
        url
    }

    /// `Bearer <token>` when header placement is selected.
    pub fn authorization_header(&self) -> Option<String> {
        match (&self.token, self.auth) {
            (Some(token), AuthPlacement::Header) => Some(format!("Bearer {token}")),
            _ => None,
        }
    }

    /// Handshake request for the WebSocket client.
    pub fn client_request(&self) -> ChatResult<Request> {
        let mut request = self
            .request_url()
            .as_str()
            .into_client_request()
            .map_err(|e| ChatError::Endpoint(e.to_string()))?;
        if let Some(value) = self.authorization_header() {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ChatError::Endpoint(format!("token is not a valid header: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(request)
    }

    /// Fails with `ChatError::Endpoint` when no handshake request can be built.
    pub fn validate(&self) -> ChatResult<()> {
        self.client_request().map(|_| ())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("auth", &self.auth)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_chat_route() {
        let ep = Endpoint::new("ws://localhost:8000").unwrap();
        assert_eq!(ep.url().as_str(), "ws://localhost:8000/ws/chat");

        let ep = Endpoint::new("wss://chat.example.com/custom/path").unwrap();
        assert_eq!(ep.url().path(), "/custom/path");
    }

    #[test]
    fn rejects_non_websocket_schemes() {
        let err = Endpoint::new("http://localhost:8000").unwrap_err();
        assert_eq!(err.kind(), "endpoint");
        assert!(Endpoint::new("not a url").is_err());
    }

    #[test]
    fn token_goes_in_query_by_default() {
        let ep = Endpoint::new("ws://localhost:8000/ws/chat?lang=en&token=old")
            .unwrap()
            .with_token("abc");
        let url = ep.request_url();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("lang".to_string(), "en".to_string()),
                ("token".to_string(), "abc".to_string())
            ]
        );
        assert_eq!(ep.authorization_header(), None);
    }

    #[test]
    fn header_placement_leaves_url_alone() {
        let ep = Endpoint::new("ws://localhost:8000")
            .unwrap()
            .with_token("abc")
            .with_auth(AuthPlacement::Header);
        assert_eq!(ep.request_url().query(), None);
        assert_eq!(ep.authorization_header().as_deref(), Some("Bearer abc"));

        let request = ep.client_request().unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc"
        );
    }

    #[test]
    fn no_token_means_no_credential() {
        let ep = Endpoint::new("ws://localhost:8000").unwrap();
        assert_eq!(ep.request_url().as_str(), "ws://localhost:8000/ws/chat");
        assert!(ep.client_request().unwrap().headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn header_token_must_be_a_valid_header_value() {
        let ep = Endpoint::new("ws://localhost:8000")
            .unwrap()
            .with_token("a\nb")
            .with_auth(AuthPlacement::Header);
        let err = ep.validate().unwrap_err();
        assert_eq!(err.kind(), "endpoint");
        assert!(err.to_string().contains("token is not a valid header"));

        // query placement percent-encodes the same token
        let ep = ep.with_auth(AuthPlacement::Query);
        assert!(ep.validate().is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let ep = Endpoint::new("ws://localhost:8000")
            .unwrap()
            .with_token("s3cret");
        let rendered = format!("{ep:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
