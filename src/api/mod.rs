// Vendor cloud REST API
// Endpoint catalog, wire types and the authorized client

pub mod client;
pub mod endpoints;
pub mod models;

pub use client::CloudApiClient;
