// ABOUTME: Keyper server API: the trait the CLI talks to and its reqwest implementation.
// ABOUTME: Handles login, bearer auth, JSON bodies and status-code error reporting.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{ClientError, Result};
use crate::models::{RemoteKeyRecord, UserRecord};

/// Operations the key workflows need from the server.
#[async_trait]
pub trait KeyperApi: Send + Sync {
    /// Fetch a user with their groups and registered keys.
    async fn get_user(&self, username: &str) -> Result<UserRecord>;

    /// Submit key records for a user. The server merges them by name.
    async fn put_user_keys(&self, username: &str, keys: Vec<RemoteKeyRecord>) -> Result<()>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Authenticated HTTP client for a Keyper server.
pub struct HttpKeyperClient {
    client: Client,
    base_url: url::Url,
    token: String,
}

impl HttpKeyperClient {
    /// Build the HTTP client and log in with the configured credentials.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let base_url = url::Url::parse(&config.address).map_err(|e| ClientError::Address {
            address: config.address.clone(),
            source: e,
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Transport {
                method: "BUILD".into(),
                url: config.address.clone(),
                source: e,
            })?;

        let mut api = Self {
            client,
            base_url,
            token: String::new(),
        };
        api.login(&config.username, &config.password).await?;
        Ok(api)
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let url = self.endpoint(&["api", "login"]);
        let body = LoginRequest { username, password };

        let text = self.send(Method::POST, url.clone(), Some(&body), false).await?;
        let response: LoginResponse = decode(&Method::POST, &url, &text)?;

        self.token = response.access_token;
        tracing::info!(username, "authenticated with keyper");
        Ok(())
    }

    /// Base URL joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> url::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: url::Url,
        body: Option<&B>,
        auth: bool,
    ) -> Result<String> {
        let transport = |e| ClientError::Transport {
            method: method.to_string(),
            url: url.to_string(),
            source: e,
        };

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        if auth {
            request = request.bearer_auth(&self.token);
        }

        tracing::debug!(%method, %url, "sending request");
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(ClientError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(method: &Method, url: &url::Url, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| ClientError::Decode {
        method: method.to_string(),
        url: url.to_string(),
        source: e,
    })
}

#[async_trait]
impl KeyperApi for HttpKeyperClient {
    async fn get_user(&self, username: &str) -> Result<UserRecord> {
        let url = self.endpoint(&["api", "users", username]);
        let text = self.send::<()>(Method::GET, url.clone(), None, true).await?;
        decode(&Method::GET, &url, &text)
    }

    async fn put_user_keys(&self, username: &str, keys: Vec<RemoteKeyRecord>) -> Result<()> {
        let url = self.endpoint(&["api", "users", username]);
        let payload = UserRecord::with_keys(keys);

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(pretty) = serde_json::to_string_pretty(&payload) {
                tracing::debug!(payload = %pretty, "updating user keys");
            }
        }

        // The response echoes user records; nothing in it is needed.
        self.send(Method::PUT, url, Some(&payload), true).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpKeyperClient {
        HttpKeyperClient {
            client: Client::new(),
            base_url: url::Url::parse(base).unwrap(),
            token: String::new(),
        }
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("https://keyper.example.org");
        assert_eq!(
            api.endpoint(&["api", "users", "alice"]).as_str(),
            "https://keyper.example.org/api/users/alice"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client("https://example.org/keyper/");
        assert_eq!(
            api.endpoint(&["api", "login"]).as_str(),
            "https://example.org/keyper/api/login"
        );
    }

    #[test]
    fn test_endpoint_encodes_username() {
        let api = client("https://keyper.example.org");
        let url = api.endpoint(&["api", "users", "a/b c"]);
        assert_eq!(url.path(), "/api/users/a%2Fb%20c");
    }

    #[test]
    fn test_decode_reports_context() {
        let url = url::Url::parse("https://keyper.example.org/api/login").unwrap();
        let result: Result<LoginResponse> = decode(&Method::POST, &url, "not json");
        match result {
            Err(ClientError::Decode { method, url, .. }) => {
                assert_eq!(method, "POST");
                assert!(url.ends_with("/api/login"));
            }
            _ => panic!("expected decode error"),
        }
    }
}
