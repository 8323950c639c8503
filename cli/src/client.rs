//! Thin JSON client over the cold-storage core's HTTP surface (spec §6).

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        bail!("request failed with {status}: {body}")
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        Self::check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding response for GET {path}"))
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        Self::check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding response for POST {path}"))
    }

    pub async fn post_no_body(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        Self::check(response).await?;
        Ok(())
    }

    pub fn operation_body(register: bool, limit: Option<i64>, force: bool, dry: bool) -> Value {
        json!({
            "register": register,
            "limit": limit,
            "force": force,
            "dry": dry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_doubling_slashes() {
        let client = Client::new("http://localhost:8080/".to_string());
        assert_eq!(client.url("/records/123"), "http://localhost:8080/records/123");
    }

    #[test]
    fn operation_body_carries_all_four_flags() {
        let body = Client::operation_body(true, Some(-2), false, true);
        assert_eq!(body["register"], true);
        assert_eq!(body["limit"], -2);
        assert_eq!(body["force"], false);
        assert_eq!(body["dry"], true);
    }
}
