//! REST client for the ServiceNow Table API.
//!
//! Wraps the table endpoints ([`ServiceNowClient::fetch_table`],
//! [`ServiceNowClient::ping`]) using [`reqwest`], authenticating either
//! with basic credentials attached per request or with an OAuth
//! `client_credentials` token acquired lazily before the first fetch.

use std::time::Duration;

use ciq_core::servicenow_config::ServiceNowConfig;
use serde::Deserialize;

/// Decrypted authentication material for a single ServiceNow instance.
#[derive(Clone)]
pub enum ClientAuth {
    Basic {
        username: String,
        password: String,
    },
    OAuth {
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            ClientAuth::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Errors from the ServiceNow REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceNowError {
    /// Credentials are missing or incomplete. Fatal -- the caller must
    /// re-supply credentials, no retry will help.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ServiceNow returned a non-2xx status code.
    #[error("ServiceNow API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Result of a [`ServiceNowClient::ping`] connection check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PingResult {
    /// Table the check fetched from.
    pub table: String,
    /// Number of records returned (0 or 1).
    pub record_count: usize,
}

/// HTTP client for a single ServiceNow instance.
///
/// Holds one connection pool for its lifetime; dropping the client
/// releases it on every exit path. OAuth tokens are cached for the
/// lifetime of the client, which is scoped to a single sync or test call.
pub struct ServiceNowClient {
    http: reqwest::Client,
    base_url: String,
    auth: ClientAuth,
    token: Option<String>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl ServiceNowClient {
    /// Build a client for `base_url` with decrypted credentials.
    pub fn new(
        base_url: &str,
        auth: ClientAuth,
        config: &ServiceNowConfig,
    ) -> Result<Self, ServiceNowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            token: None,
            page_size: config.page_size,
        })
    }

    /// Validate credentials by fetching a single row from `table`.
    pub async fn ping(&mut self, table: &str) -> Result<PingResult, ServiceNowError> {
        let fields = ["sys_id".to_string()];
        let records = self.fetch_table(table, &fields, Some(1), None).await?;
        Ok(PingResult {
            table: table.to_string(),
            record_count: records.len(),
        })
    }

    /// Fetch up to `limit` rows from a table.
    ///
    /// Issues exactly one request -- there is no multi-page looping, the
    /// limit bounds the result outright. Returns the raw `result` array
    /// from the remote payload.
    pub async fn fetch_table(
        &mut self,
        table: &str,
        fields: &[String],
        limit: Option<u32>,
        query: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, ServiceNowError> {
        let mut request = self
            .http
            .get(format!("{}/api/now/table/{table}", self.base_url))
            .query(&[
                ("sysparm_limit", limit.unwrap_or(self.page_size).to_string()),
                ("sysparm_display_value", "true".to_string()),
            ]);
        if !fields.is_empty() {
            request = request.query(&[("sysparm_fields", fields.join(","))]);
        }
        if let Some(query_string) = query {
            request = request.query(&[("sysparm_query", query_string)]);
        }

        let request = self.authorize(request).await?;
        let response = request.send().await?;
        let payload: TableResponse = Self::parse_response(response).await?;
        Ok(payload.result)
    }

    // ---- private helpers ----

    /// Attach authentication to a request, acquiring an OAuth token first
    /// when needed.
    async fn authorize(
        &mut self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ServiceNowError> {
        if let ClientAuth::Basic { username, password } = &self.auth {
            if username.is_empty() || password.is_empty() {
                return Err(ServiceNowError::Credential(
                    "Username and password are required for basic authentication".to_string(),
                ));
            }
            return Ok(request.basic_auth(username, Some(password)));
        }

        let token = self.ensure_token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Return the cached OAuth token, acquiring one via the
    /// `client_credentials` grant on first use.
    async fn ensure_token(&mut self) -> Result<String, ServiceNowError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let ClientAuth::OAuth {
            client_id,
            client_secret,
        } = &self.auth
        else {
            return Err(ServiceNowError::Credential(
                "OAuth token requested for a basic-auth client".to_string(),
            ));
        };
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(ServiceNowError::Credential(
                "OAuth credentials are incomplete".to_string(),
            ));
        }

        let response = self
            .http
            .post(format!("{}/oauth_token.do", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;

        let payload: TokenResponse = Self::parse_response(response).await?;
        let token = payload
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ServiceNowError::Credential(
                    "ServiceNow did not return an access token".to_string(),
                )
            })?;

        tracing::debug!(base_url = %self.base_url, "Acquired ServiceNow OAuth token");
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`ServiceNowError::Api`] containing the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ServiceNowError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ServiceNowError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceNowError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_auth_debug_redacts_secrets() {
        let basic = ClientAuth::Basic {
            username: "svc".to_string(),
            password: "secret123".to_string(),
        };
        let debug = format!("{basic:?}");
        assert!(debug.contains("svc"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret123"));

        let oauth = ClientAuth::OAuth {
            client_id: "client-1".to_string(),
            client_secret: "hunter2".to_string(),
        };
        let debug = format!("{oauth:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_api_error_display_carries_status_and_body() {
        let err = ServiceNowError::Api {
            status: 403,
            body: "insufficient rights".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("403"));
        assert!(rendered.contains("insufficient rights"));
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = ServiceNowConfig::default();
        let client = ServiceNowClient::new(
            "https://acme.service-now.com/",
            ClientAuth::Basic {
                username: "svc".to_string(),
                password: "pw".to_string(),
            },
            &config,
        )
        .unwrap();
        assert_eq!(client.base_url, "https://acme.service-now.com");
    }
}
