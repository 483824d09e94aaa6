#![allow(async_fn_in_trait)]
pub mod band_math;
pub mod caption;
pub mod catalog;
pub mod composite;
pub mod credentials;
pub mod download;
pub mod error;
pub mod geocode;
pub mod oauth;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod scene;
pub mod schedule;
pub mod settings;
#[cfg(test)]
mod test_server;
