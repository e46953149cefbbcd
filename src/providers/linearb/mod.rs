pub mod client;
pub mod series;
pub mod types;

pub use client::LinearbClient;
