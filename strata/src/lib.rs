#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # strata
//!
//! Layered settings resolution with deep-merged config files.
//!
//! A settings object is described by a [`SettingsSchema`]: its declared
//! fields and a [`SettingsConfig`] block naming the config files to read and
//! how to combine them. Values are gathered from an ordered list of sources
//! and composed into one raw mapping, which serde then turns into a typed
//! settings struct.
//!
//! ## Core Types
//!
//! - [`ConfigLoader`] and [`ReaderRegistry`]: reading INI, TOML, YAML and
//!   JSON files into raw mappings
//! - [`deep_merge`] and [`MergePolicy`]: combining the files
//! - [`SettingsSource`] and its implementations: where values come from
//! - [`SettingsPipeline`]: precedence, defaults and the extra-field policy
//! - [`Error`] and [`Result`]: Error handling types
//!
//! ## Source precedence
//!
//! The default pipeline consults, from highest to lowest precedence:
//!
//! 1. values passed explicitly by the caller
//! 2. environment variables
//! 3. the dotenv file
//! 4. the secrets directory
//! 5. config files (later files in the list override earlier ones)
//!
//! ## Examples
//!
//! ```no_run
//! use serde::Deserialize;
//! use strata::{FieldSpec, SettingsPipeline, SettingsSchema};
//!
//! #[derive(Deserialize)]
//! struct App {
//!     name: String,
//!     description: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     app: App,
//! }
//!
//! let schema = SettingsSchema::builder()
//!     .field(FieldSpec::new("app").complex())
//!     .config_file("settings.toml")
//!     .config_file("~/.config/app/local.yaml")
//!     .build()
//!     .unwrap();
//!
//! let pipeline = SettingsPipeline::with_defaults(schema, serde_json::Map::new()).unwrap();
//! let settings: Settings = pipeline.resolve_into().unwrap();
//! println!("{}: {}", settings.app.name, settings.app.description);
//! ```

pub mod error;
pub mod loader;
pub mod merge;
pub mod path;
pub mod pipeline;
pub mod readers;
pub mod schema;
pub mod source;
pub mod value;

#[cfg(test)]
mod proptests;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use loader::{ConfigFileRef, ConfigLoader};
pub use merge::{deep_merge, deep_update, merge_all, shallow_merge, MergePolicy};
pub use pipeline::SettingsPipeline;
pub use readers::{FileFormat, ReaderFn, ReaderRegistry};
pub use schema::{ExtraPolicy, FieldSpec, SettingsConfig, SettingsSchema, SettingsSchemaBuilder};
pub use source::{
    ConfigFileSource, ConfigFileSourceBuilder, DotEnvSource, EnvSource, FieldValue, InitSource,
    SecretsSource, SettingsSource,
};
pub use value::Mapping;
