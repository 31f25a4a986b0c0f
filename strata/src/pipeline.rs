//! Source precedence and final composition.
//!
//! Sources are listed from highest to lowest precedence. Resolution starts
//! from the schema's field defaults and overlays each source's contribution
//! from the last source to the first with [`deep_update`], so an earlier
//! source always wins and later ones only fill what is unset. Nested mappings
//! from different sources are combined key by key.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::merge::deep_update;
use crate::schema::{ExtraPolicy, SettingsSchema};
use crate::source::{
    ConfigFileSource, DotEnvSource, EnvSource, InitSource, SecretsSource, SettingsSource,
};
use crate::value::Mapping;

/// An ordered list of settings sources for one schema.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata::pipeline::SettingsPipeline;
/// use strata::schema::{FieldSpec, SettingsSchema};
/// use strata::source::InitSource;
///
/// let schema = SettingsSchema::builder()
///     .field(FieldSpec::new("name").default_value(json!("svc")))
///     .field(FieldSpec::new("port").default_value(json!(8080)))
///     .build()
///     .unwrap();
///
/// let mut init = serde_json::Map::new();
/// init.insert("port".into(), json!(9000));
///
/// let mut pipeline = SettingsPipeline::new(schema);
/// pipeline.push(InitSource::new(init));
///
/// let resolved = pipeline.resolve().unwrap();
/// assert_eq!(resolved["name"], "svc");
/// assert_eq!(resolved["port"], 9000);
/// ```
pub struct SettingsPipeline {
    schema: SettingsSchema,
    sources: Vec<Box<dyn SettingsSource>>,
}

impl std::fmt::Debug for SettingsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsPipeline")
            .field("schema", &self.schema)
            .field("sources", &self.sources())
            .finish()
    }
}

impl SettingsPipeline {
    /// Create a pipeline with no sources.
    #[must_use]
    pub const fn new(schema: SettingsSchema) -> Self {
        Self {
            schema,
            sources: Vec::new(),
        }
    }

    /// Create the standard pipeline: explicit values, environment variables,
    /// the dotenv file, the secrets directory, then config files.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while constructing a source. Sources
    /// that read files do all their I/O here.
    pub fn with_defaults(schema: SettingsSchema, init: Mapping) -> Result<Self> {
        let env = EnvSource::new(&schema);
        let dotenv = DotEnvSource::new(&schema)?;
        let secrets = SecretsSource::new(&schema)?;
        let config_file = ConfigFileSource::new(&schema)?;

        let mut pipeline = Self::new(schema);
        pipeline.push(InitSource::new(init));
        pipeline.push(env);
        pipeline.push(dotenv);
        pipeline.push(secrets);
        pipeline.push(config_file);
        Ok(pipeline)
    }

    /// Append a source with lower precedence than every source already added.
    pub fn push<S>(&mut self, source: S) -> &mut Self
    where
        S: SettingsSource + 'static,
    {
        self.sources.push(Box::new(source));
        self
    }

    /// Returns the source names in precedence order.
    #[must_use]
    pub fn sources(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// Returns the schema this pipeline resolves.
    #[must_use]
    pub const fn schema(&self) -> &SettingsSchema {
        &self.schema
    }

    /// Compose every source into the final settings mapping.
    ///
    /// Keys that refer to a declared field are stored under the field's
    /// declared name. Undeclared keys are then handled per the schema's
    /// [`ExtraPolicy`].
    ///
    /// # Errors
    ///
    /// Returns the first source error, or [`Error::ExtraForbidden`] when
    /// extras are forbidden and some source supplied one.
    pub fn resolve(&self) -> Result<Mapping> {
        let layers = self
            .sources
            .iter()
            .map(|source| {
                let values = source.resolve_all(&self.schema)?;
                log::debug!("{} source contributed {} key(s)", source.name(), values.len());
                Ok(self.canonicalize(values))
            })
            .collect::<Result<Vec<_>>>()?;

        let resolved = layers
            .iter()
            .rev()
            .fold(self.defaults(), |acc, layer| deep_update(&acc, layer));

        self.apply_extra_policy(resolved)
    }

    /// Resolve and deserialize into a typed settings struct.
    ///
    /// # Errors
    ///
    /// Returns any [`resolve`](Self::resolve) error, or
    /// [`Error::Validation`] when the mapping does not fit `T`.
    pub fn resolve_into<T: DeserializeOwned>(&self) -> Result<T> {
        let resolved = self.resolve()?;
        serde_json::from_value(Value::Object(resolved)).map_err(|e| Error::Validation {
            field: "settings".into(),
            message: e.to_string(),
        })
    }

    fn defaults(&self) -> Mapping {
        self.schema
            .fields()
            .iter()
            .filter_map(|field| {
                field
                    .default()
                    .map(|value| (field.name().to_string(), value.clone()))
            })
            .collect()
    }

    fn canonicalize(&self, values: Mapping) -> Mapping {
        values
            .into_iter()
            .map(|(key, value)| match self.schema.field(&key) {
                Some(field) => (field.name().to_string(), value),
                None => (key, value),
            })
            .collect()
    }

    fn apply_extra_policy(&self, resolved: Mapping) -> Result<Mapping> {
        match self.schema.config().extra {
            ExtraPolicy::Allow => Ok(resolved),
            ExtraPolicy::Ignore => Ok(resolved
                .into_iter()
                .filter(|(key, _)| {
                    let declared = self.schema.is_declared(key);
                    if !declared {
                        log::trace!("ignoring extra key '{key}'");
                    }
                    declared
                })
                .collect()),
            ExtraPolicy::Forbid => {
                let mut extras: Vec<String> = resolved
                    .keys()
                    .filter(|key| !self.schema.is_declared(key))
                    .cloned()
                    .collect();
                if extras.is_empty() {
                    Ok(resolved)
                } else {
                    extras.sort();
                    Err(Error::ExtraForbidden { keys: extras })
                }
            }
        }
    }
}
