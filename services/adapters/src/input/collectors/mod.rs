//! Venue-specific streaming clients

pub mod woo;

pub use woo::WooClient;
