//! Values passed directly by the caller.

use crate::error::Result;
use crate::schema::{FieldSpec, SettingsSchema};
use crate::source::{FieldValue, SettingsSource};
use crate::value::Mapping;

/// Explicit values supplied at construction time.
///
/// This is the highest-precedence source in the default pipeline. Its
/// mapping is contributed as-is, undeclared keys included.
#[derive(Debug, Clone, Default)]
pub struct InitSource {
    values: Mapping,
}

impl InitSource {
    /// Wrap caller-supplied values.
    #[must_use]
    pub const fn new(values: Mapping) -> Self {
        Self { values }
    }
}

impl SettingsSource for InitSource {
    fn name(&self) -> &'static str {
        "init"
    }

    fn field_value(&self, field: &FieldSpec) -> Result<FieldValue> {
        Ok(FieldValue {
            value: self.values.get(field.name()).cloned(),
            key: field.name().to_string(),
            is_complex: false,
        })
    }

    fn resolve_all(&self, _schema: &SettingsSchema) -> Result<Mapping> {
        Ok(self.values.clone())
    }
}
