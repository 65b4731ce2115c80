use anyhow::Context;
use async_trait::async_trait;

use super::IdentityProvider;

pub struct RemoteIdentityProvider {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteIdentityProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn resolve_token(&self, token: &str) -> anyhow::Result<Option<String>> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("failed to call identity service")?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse identity response")?;

        if !status.is_success() {
            anyhow::bail!("identity service error ({}): {}", status, data);
        }

        data["id"]
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| anyhow::anyhow!("missing id in identity response"))
    }
}
