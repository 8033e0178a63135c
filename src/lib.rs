//! Location resolution, proximity search and map interaction for community
//! business listings.

pub mod config;
pub mod listing;
pub mod location;
pub mod map;
pub mod server;
