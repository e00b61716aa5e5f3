//! Infrastructure layer (adapters/implementations).
//!
//! This module contains the IO-facing pieces: draw.io reading, YAML output
//! and configuration files.

pub mod app_config;
pub mod diagram;
pub mod yaml;
