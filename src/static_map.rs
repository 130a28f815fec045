//! Google Static Maps image URLs for a set of results.

use url::Url;

use crate::google_maps::GOOGLE_MAPS_API_BASE;
use crate::record::Recommendation;

const MAP_SIZE: &str = "640x400";
const MARKER_LABELS: &str = "123456789";

/// Image URL with one numbered marker per located result, in result order.
///
/// `None` when no result has coordinates.
pub fn static_map_url(results: &[Recommendation], api_key: &str) -> Option<String> {
    let mut params: Vec<(&str, String)> = vec![("size", MAP_SIZE.to_string())];
    let markers = results
        .iter()
        .filter_map(|r| r.latitude.zip(r.longitude))
        .zip(MARKER_LABELS.chars().map(Some).chain(std::iter::repeat(None)));
    for ((lat, lng), label) in markers {
        let marker = match label {
            Some(label) => format!("color:red|label:{label}|{lat},{lng}"),
            None => format!("color:red|{lat},{lng}"),
        };
        params.push(("markers", marker));
    }
    if params.len() == 1 {
        return None;
    }
    params.push(("key", api_key.to_string()));

    let url = Url::parse_with_params(&format!("{GOOGLE_MAPS_API_BASE}/staticmap"), &params).ok()?;
    Some(url.to_string())
}
