//! Transports exposing a [`ServerHost`](super::host::ServerHost)

pub mod rest;

pub use rest::RestExposure;
