use crate::config::SupplierSettings;
use crate::domain::model::SupplierHotel;
use crate::domain::ports::SupplierGateway;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

/// 透過 HTTP 查詢單一供應商：`GET {endpoint}?city={city}`
pub struct HttpSupplierGateway {
    provider_id: String,
    endpoint: String,
    timeout: Duration,
    probe_timeout: Duration,
    client: Client,
}

impl HttpSupplierGateway {
    pub fn new(settings: SupplierSettings) -> Self {
        Self::with_client(settings, Client::new())
    }

    /// Share one connection pool between gateways.
    pub fn with_client(settings: SupplierSettings, client: Client) -> Self {
        Self {
            provider_id: settings.id,
            endpoint: settings.endpoint,
            timeout: settings.timeout,
            probe_timeout: settings.probe_timeout,
            client,
        }
    }

    async fn send(&self, city: &str, timeout: Duration) -> Result<Response> {
        tracing::debug!("📡 {}: GET {} (city={})", self.provider_id, self.endpoint, city);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("city", city)])
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }

    async fn request(&self, city: &str) -> Result<Vec<SupplierHotel>> {
        let hotels: Vec<SupplierHotel> = self.send(city, self.timeout).await?.json().await?;
        Ok(hotels)
    }
}

#[async_trait]
impl SupplierGateway for HttpSupplierGateway {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn fetch(&self, city: &str) -> Vec<SupplierHotel> {
        match self.request(city).await {
            Ok(hotels) => {
                tracing::debug!("📡 {}: received {} hotels", self.provider_id, hotels.len());
                hotels
            }
            Err(e) => {
                tracing::warn!("⚠️ Error fetching from {}: {}", self.provider_id, e);
                Vec::new()
            }
        }
    }

    /// Reachability only: any 2xx answer counts, the body is not read.
    async fn probe(&self) -> bool {
        match self.send("test", self.probe_timeout).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("🩺 {} is unavailable: {}", self.provider_id, e);
                false
            }
        }
    }
}
