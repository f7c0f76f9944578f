// Easee Bridge - library root

pub mod api;
pub mod auth;
pub mod config;
pub mod devices;
pub mod error;
pub mod observations;
