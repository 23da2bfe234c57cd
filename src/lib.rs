#![deny(clippy::unwrap_used)]

pub mod api;
pub mod attribute;
pub mod category;
pub mod config;
pub mod error;
pub mod listing;
pub mod render;
pub mod seo;
pub mod text;
pub mod view;
