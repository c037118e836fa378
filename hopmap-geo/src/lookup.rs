//! HTTP geolocation client for the ipwhois.app JSON API.

use std::time::Duration;

use hopmap_core::enrich::GeoLookup;
use hopmap_core::{GeoInfo, LookupError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IpWhoisResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl TryFrom<IpWhoisResponse> for GeoInfo {
    type Error = LookupError;

    fn try_from(resp: IpWhoisResponse) -> Result<Self, Self::Error> {
        if !resp.success {
            return Err(LookupError::Rejected(
                resp.message.unwrap_or_else(|| "success=false".to_string()),
            ));
        }
        Ok(GeoInfo {
            country: resp.country.unwrap_or_default(),
            region: resp.region.unwrap_or_default(),
            city: resp.city.unwrap_or_default(),
            latitude: resp.latitude,
            longitude: resp.longitude,
        })
    }
}

pub struct HttpGeoLookup {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpGeoLookup {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hopmap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn url_for(&self, address: &str) -> String {
        format!("{}{}", self.endpoint, address)
    }
}

impl GeoLookup for HttpGeoLookup {
    fn lookup(&mut self, address: &str) -> Result<GeoInfo, LookupError> {
        log::debug!("looking up {address}");
        let response = self
            .client
            .get(self.url_for(address))
            .send()
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        let body: IpWhoisResponse = response
            .json()
            .map_err(|e| LookupError::Malformed(e.to_string()))?;
        GeoInfo::try_from(body)
    }
}
