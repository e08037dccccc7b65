//! Gateway session and account selection.

use crate::client::IbClient;
use crate::error::{IbError, Result};
use crate::types::SessionStatus;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawAuthStatus {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    competing: bool,
}

#[derive(Debug, Deserialize)]
struct RawAccounts {
    #[serde(default)]
    accounts: Vec<String>,
    #[serde(rename = "selectedAccount")]
    selected_account: Option<String>,
}

impl IbClient {
    /// # Errors
    /// Returns error if the gateway cannot be reached.
    pub async fn session_status(&self) -> Result<SessionStatus> {
        let raw: RawAuthStatus = self.get("/iserver/auth/status", &[]).await?;
        Ok(SessionStatus {
            authenticated: raw.authenticated,
            connected: raw.connected,
            competing: raw.competing,
        })
    }

    /// Fails unless the brokerage session is authenticated and not
    /// competing with another login.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` for an unusable session.
    pub async fn ensure_session(&self) -> Result<SessionStatus> {
        let status = self.session_status().await?;
        if !status.is_ready() {
            tracing::warn!(?status, "IB gateway session not ready");
            return Err(IbError::NotAuthenticated);
        }
        tracing::info!(base_url = %self.base_url(), "IB gateway session ready");
        Ok(status)
    }

    /// Configured account, else the gateway's selected account, else its first.
    ///
    /// # Errors
    /// Returns `Configuration` when the gateway lists no accounts.
    pub async fn trading_account(&self) -> Result<String> {
        if let Some(account) = &self.config.account_id {
            return Ok(account.clone());
        }

        let raw: RawAccounts = self.get("/iserver/accounts", &[]).await?;
        raw.selected_account
            .filter(|a| !a.is_empty())
            .or_else(|| raw.accounts.into_iter().next())
            .ok_or_else(|| IbError::Configuration("gateway reports no accounts".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{IbClient, IbClientConfig};
    use crate::error::IbError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> IbClient {
        IbClient::new(IbClientConfig::default().with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iserver/auth/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true, "connected": true, "competing": false
            })))
            .mount(&server)
            .await;

        assert!(client(&server).ensure_session().await.unwrap().is_ready());
    }

    #[tokio::test]
    async fn test_ensure_session_rejects_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iserver/auth/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": false, "connected": true
            })))
            .mount(&server)
            .await;

        let err = client(&server).ensure_session().await.unwrap_err();
        assert!(matches!(err, IbError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_trading_account_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iserver/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accounts": ["DU111", "DU222"],
                "selectedAccount": "DU222"
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).trading_account().await.unwrap(), "DU222");

        let configured = IbClient::new(
            IbClientConfig::default()
                .with_base_url(server.uri())
                .with_account_id("DU999"),
        )
        .unwrap();
        assert_eq!(configured.trading_account().await.unwrap(), "DU999");
    }
}
