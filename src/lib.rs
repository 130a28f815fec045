//! BiteFinder: restaurant dataset builder and recommendation service.
//!
//! The `build_dataset` binary turns the raw Yelp, restaurant and fast-food
//! dumps into one combined CSV table (see [`dataset`]). The `bitefinder`
//! server answers top-N queries against that table (see [`recommend`]) and
//! proxies the Google Maps lookups used by the map views.

pub mod config;
pub mod dataset;
pub mod error;
pub mod google_maps;
pub mod logging;
pub mod record;
pub mod recommend;
pub mod server;
pub mod static_map;
pub mod table;
pub mod utils;
