//! # Pixgate Common Library
//!
//! Shared code for the pixgate screening client including:
//! - API configuration and its resolution (CLI, environment, TOML, defaults)
//! - Error taxonomy
//! - Event types (PixgateEvent enum) and the broadcast EventBus
//! - Backend wire types and URL resolution

pub mod api;
pub mod config;
pub mod error;
pub mod events;

pub use config::{ApiConfig, CapacityPolicy};
pub use error::{Error, Result};
pub use events::{EventBus, GalleryList, NoticeLevel, PixgateEvent};
