pub mod client;
pub mod datetime;
pub mod dto;

pub use client::{StatsClient, StatsClientError};
pub use dto::{EndpointHit, ViewStats};
