use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use log::{info, error, debug, warn};

use crate::error::MapsError;

pub const GOOGLE_MAPS_API_BASE: &str = "https://maps.googleapis.com/maps/api";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelDistance {
    pub distance_text: String,
    pub distance_meters: u64,
    pub duration_text: String,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct MapsClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl MapsClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, api_key, GOOGLE_MAPS_API_BASE)
    }

    pub fn with_base_url(client: Client, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn key(&self) -> Result<&str, MapsError> {
        self.api_key().ok_or(MapsError::MissingApiKey)
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, MapsError> {
        let url = format!("{}/{}/json", self.base_url, endpoint);
        debug!("Requesting {} with params: {:?}", url, params);

        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            error!("Google Maps {} request failed. Status: {}", endpoint, status);
            return Err(MapsError::Api(format!("{}: {}", status, body)));
        }
        Ok(response.json::<Value>().await?)
    }

    /// Look up the coordinates of an address. `Ok(None)` when nothing matched.
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, MapsError> {
        info!("Geocoding address: {}", address);
        let key = self.key()?;
        let response = self
            .get_json("geocode", &[("address", address), ("key", key)])
            .await?;
        let coordinates = parse_geocode(&response)?;
        if coordinates.is_none() {
            warn!("No geocoding result for {}", address);
        }
        Ok(coordinates)
    }

    /// Road distance and travel time between two places. `Ok(None)` when no route exists.
    pub async fn distance(&self, origin: &str, destination: &str) -> Result<Option<TravelDistance>, MapsError> {
        info!("Calculating distance from {} to {}", origin, destination);
        let key = self.key()?;
        let response = self
            .get_json(
                "distancematrix",
                &[("origins", origin), ("destinations", destination), ("key", key)],
            )
            .await?;
        let distance = parse_distance(&response)?;
        if distance.is_none() {
            warn!("No route found from {} to {}", origin, destination);
        }
        Ok(distance)
    }
}

/// `Ok(false)` for the statuses Google uses to say "nothing found".
fn has_results(response: &Value) -> Result<bool, MapsError> {
    if let Some(error_message) = response["error_message"].as_str() {
        error!("Google Maps API error: {}", error_message);
        return Err(MapsError::Api(error_message.to_string()));
    }
    match response["status"].as_str() {
        Some("OK") => Ok(true),
        Some("ZERO_RESULTS") | Some("NOT_FOUND") => Ok(false),
        Some(other) => Err(MapsError::Api(other.to_string())),
        None => Err(MapsError::Api("response has no status".to_string())),
    }
}

fn parse_geocode(response: &Value) -> Result<Option<Coordinates>, MapsError> {
    if !has_results(response)? {
        return Ok(None);
    }
    let location = &response["results"][0]["geometry"]["location"];
    Ok(match (location["lat"].as_f64(), location["lng"].as_f64()) {
        (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
        _ => None,
    })
}

fn parse_distance(response: &Value) -> Result<Option<TravelDistance>, MapsError> {
    if !has_results(response)? {
        return Ok(None);
    }
    let element = &response["rows"][0]["elements"][0];
    if element["status"].as_str() != Some("OK") {
        debug!("Distance matrix element status: {:?}", element["status"]);
        return Ok(None);
    }
    let distance = &element["distance"];
    let duration = &element["duration"];
    Ok(Some(TravelDistance {
        distance_text: distance["text"].as_str().unwrap_or_default().to_string(),
        distance_meters: distance["value"].as_u64().unwrap_or_default(),
        duration_text: duration["text"].as_str().unwrap_or_default().to_string(),
        duration_seconds: duration["value"].as_u64().unwrap_or_default(),
    }))
}
