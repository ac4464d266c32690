//! HTTP request handlers

pub mod image;
pub mod service;

pub use image::*;
pub use service::*;
