//! Reverse-geocoding collaborator. The engine only stores what this returns.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::GeocoderConfig;
use crate::core::error::EngineError;
use crate::core::types::{Address, Coordinate};

#[derive(Debug, Deserialize)]
struct NominatimReply {
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    suburb: Option<String>,
    neighbourhood: Option<String>,
    city_district: Option<String>,
    city: Option<String>,
    road: Option<String>,
}

pub struct NominatimResolver {
    client: Client,
    base_url: String,
}

impl NominatimResolver {
    pub fn new(config: &GeocoderConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(EngineError::from)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn resolve(&self, at: Coordinate) -> Result<Address, EngineError> {
        let url = format!("{}/reverse", self.base_url);
        let reply: NominatimReply = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .query(&[
                ("format", "json".to_string()),
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("zoom", "18".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(to_address(reply))
    }
}

fn to_address(reply: NominatimReply) -> Address {
    let a = reply.address;
    Address {
        street_address: reply.display_name,
        region: a.suburb.or(a.neighbourhood).or(a.city_district).or(a.city),
        area: a.road,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_prefers_suburb_then_falls_back() {
        let reply: NominatimReply = serde_json::from_str(
            r#"{"display_name":"Road 7, Gulshan, Dhaka","address":{"city":"Dhaka","neighbourhood":"Gulshan 1","road":"Road 7"}}"#,
        )
        .unwrap();
        let addr = to_address(reply);
        assert_eq!(addr.region.as_deref(), Some("Gulshan 1"));
        assert_eq!(addr.area.as_deref(), Some("Road 7"));
        assert_eq!(addr.street_address.as_deref(), Some("Road 7, Gulshan, Dhaka"));
    }

    #[test]
    fn empty_reply_yields_empty_address() {
        let reply: NominatimReply = serde_json::from_str("{}").unwrap();
        assert_eq!(to_address(reply), Address::default());
    }
}
