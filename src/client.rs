use crate::error::UpstreamError;
use crate::model::{Asset, Fleet};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Read side of the fleet telemetry service.
#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn list_fleets(&self) -> Result<Vec<Fleet>, UpstreamError>;

    async fn list_assets(&self, fleet_id: &str) -> Result<Vec<Asset>, UpstreamError>;
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

pub struct HttpFleetClient {
    http: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl HttpFleetClient {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let mut base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::OpaqueUrl(base_url.to_string()));
        }
        // `Url::join` replaces the last path segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .user_agent("fleet-telemetry-receiver/0.1")
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        Ok(self.base_url.join(path)?)
    }

    async fn fetch_data<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, UpstreamError> {
        let response = self
            .http
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status,
                url: url.to_string(),
            });
        }
        let envelope: DataEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl FleetApi for HttpFleetClient {
    async fn list_fleets(&self) -> Result<Vec<Fleet>, UpstreamError> {
        let url = self.endpoint("fleets")?;
        self.fetch_data(url).await
    }

    async fn list_assets(&self, fleet_id: &str) -> Result<Vec<Asset>, UpstreamError> {
        let mut url = self.endpoint("fleets")?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::OpaqueUrl(self.base_url.to_string()))?
            .push(fleet_id)
            .push("assets");
        self.fetch_data(url).await
    }
}
