//! HTTP client for the geo service.

use std::time::Duration;

use async_trait::async_trait;
use common::ZoneId;
use domain::{Zone, ZoneDirectory, ZoneError};
use reqwest::StatusCode;

/// Timeout applied to every geo service call.
pub const GEO_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ZoneDirectory`] backed by `GET {base}/api/v1/geo/zones/{id}`.
#[derive(Clone)]
pub struct HttpZoneDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpZoneDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn zone_url(&self, zone_id: ZoneId) -> String {
        format!("{}/api/v1/geo/zones/{}", self.base_url, zone_id)
    }
}

#[async_trait]
impl ZoneDirectory for HttpZoneDirectory {
    #[tracing::instrument(skip(self))]
    async fn verify_zone(&self, zone_id: ZoneId) -> Result<Zone, ZoneError> {
        let response = self
            .client
            .get(self.zone_url(zone_id))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "geo service request failed");
                ZoneError::Unavailable(format!("could not reach the geo service: {e}"))
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(ZoneError::NotFound(zone_id)),
            status => {
                tracing::warn!(%status, "geo service answered with an unexpected status");
                return Err(ZoneError::Unavailable(format!(
                    "geo service answered {status}"
                )));
            }
        }

        // Only the id matters; a body we cannot read still confirms the zone.
        Ok(response.json::<Zone>().await.unwrap_or(Zone {
            id: zone_id,
            name: None,
        }))
    }
}
