//! mpa-builder library
//!
//! Generates the bundler configuration for multi-page, multi-locale static
//! sites and drives the bundler, linter and dev server around it.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod i18n;
pub mod plugins;
pub mod resolver;
pub mod server;
pub mod transform;
pub mod utils;

pub use bundler::{generate, BundleConfig, Bundler, Mode};
pub use cli::Cli;
pub use config::Config;
pub use error::Error;
