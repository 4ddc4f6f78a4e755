use crate::client::models::{CreateCheckoutKeyRequest, NewKeyType};
use crate::client::request::{ApiResponse, HttpRequest};
use crate::config::{ApiConfig, Vcs};
use crate::error::{ClientError, ConfigError};
use crate::security::SecureString;
use reqwest::Client;
use std::time::Duration;

/// Header CircleCI reads the personal API token from
pub const TOKEN_HEADER: &str = "Circle-Token";

/// CircleCI REST client covering the endpoints used for checkout key rotation
pub struct CircleCiClient {
    base_url: String,
    token: SecureString,
    client: Client,
}

impl CircleCiClient {
    pub fn new(api: &ApiConfig, token: SecureString) -> Result<Self, ConfigError> {
        let client = Self::create_client(api)?;

        Ok(Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Build the HTTP client. No timeout unless one is configured.
    fn create_client(api: &ApiConfig) -> Result<Client, ConfigError> {
        let mut builder = Client::builder().user_agent(api.user_agent.as_str());
        if let Some(secs) = api.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().map_err(ConfigError::HttpClient)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn project_settings_url(&self, vcs: Vcs, org: &str) -> String {
        format!("{}/api/v1.1/organization/{}/{}/settings", self.base_url, vcs, org)
    }

    pub fn checkout_key_url(&self, vcs: Vcs, org: &str, project: &str) -> String {
        format!(
            "{}/api/v2/project/{}/{}/{}/checkout-key",
            self.base_url, vcs, org, project
        )
    }

    fn authorized(&self, url: String) -> HttpRequest {
        HttpRequest::new(url).header(TOKEN_HEADER, self.token.as_str())
    }

    /// Fetch the organization settings, which list every project
    pub async fn list_projects(&self, vcs: Vcs, org: &str) -> Result<ApiResponse, ClientError> {
        self.authorized(self.project_settings_url(vcs, org))
            .send(&self.client)
            .await
    }

    pub async fn list_checkout_keys(
        &self,
        vcs: Vcs,
        org: &str,
        project: &str,
    ) -> Result<ApiResponse, ClientError> {
        self.authorized(self.checkout_key_url(vcs, org, project))
            .send(&self.client)
            .await
    }

    /// Ask the provider for a new checkout key; it picks the algorithm
    pub async fn create_checkout_key(
        &self,
        vcs: Vcs,
        org: &str,
        project: &str,
        key_type: NewKeyType,
    ) -> Result<ApiResponse, ClientError> {
        self.authorized(self.checkout_key_url(vcs, org, project))
            .method("POST")
            .data_from(&CreateCheckoutKeyRequest { key_type })?
            .send(&self.client)
            .await
    }
}
