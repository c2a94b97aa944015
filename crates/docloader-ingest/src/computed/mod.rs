//! Computed fields
//!
//! A computed field is filled in after the rest of a document is assembled,
//! by a named plugin that reads other fields of the same document. They are
//! configured as `target=plugin(source,source,...)` entries separated by `;`.
//!
//! Plugins are registered by name in a [`ComputedFieldRegistry`] before the
//! run starts; every configured name is resolved up front so an unknown
//! plugin stops the run before any row is read.

mod builtins;

pub use builtins::{Coalesce, Concat, Sum};

use docloader_common::{DocloaderError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::document::OutputRecord;
use crate::field::FieldValue;

/// Derives one field value from the current values of other fields
pub trait ComputedField: Send + Sync {
    /// `sources` holds the text of each source field, in configured order.
    /// Absent fields are passed as empty strings. Returning `None` leaves the
    /// target untouched.
    fn compute(&self, target: &str, sources: &[String]) -> Option<FieldValue>;
}

impl<F> ComputedField for F
where
    F: Fn(&str, &[String]) -> Option<FieldValue> + Send + Sync,
{
    fn compute(&self, target: &str, sources: &[String]) -> Option<FieldValue> {
        self(target, sources)
    }
}

/// One parsed `target=plugin(args)` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedFieldSpec {
    pub target: String,
    pub plugin: String,
    pub sources: Vec<String>,
}

impl ComputedFieldSpec {
    /// Parse a `;` separated list of computed field entries
    pub fn parse_all(config: &str) -> Result<Vec<ComputedFieldSpec>> {
        let mut specs: Vec<ComputedFieldSpec> = Vec::new();

        for entry in config.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let spec = Self::parse(entry)?;
            if specs.iter().any(|existing| existing.target == spec.target) {
                return Err(DocloaderError::computed_field(
                    entry,
                    format!("target '{}' is computed more than once", spec.target),
                ));
            }
            specs.push(spec);
        }

        Ok(specs)
    }

    pub fn parse(entry: &str) -> Result<ComputedFieldSpec> {
        let parts: Vec<&str> = entry.split('=').collect();
        if parts.len() != 2 {
            return Err(DocloaderError::computed_field(
                entry,
                "expected exactly one '=' between target and plugin",
            ));
        }

        let target = parts[0].trim();
        if target.is_empty() {
            return Err(DocloaderError::computed_field(entry, "missing target field"));
        }

        let call = parts[1].trim();
        let open = call
            .find('(')
            .ok_or_else(|| DocloaderError::computed_field(entry, "missing '('"))?;
        let close = call
            .rfind(')')
            .filter(|close| *close > open)
            .ok_or_else(|| DocloaderError::computed_field(entry, "missing ')'"))?;
        if !call[close + 1..].trim().is_empty() {
            return Err(DocloaderError::computed_field(
                entry,
                "unexpected text after ')'",
            ));
        }

        let plugin = call[..open].trim();
        if plugin.is_empty() {
            return Err(DocloaderError::computed_field(entry, "missing plugin name"));
        }

        let sources = call[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|arg| !arg.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ComputedFieldSpec {
            target: target.to_string(),
            plugin: plugin.to_string(),
            sources,
        })
    }
}

/// Plugins available to computed fields, by name
#[derive(Clone, Default)]
pub struct ComputedFieldRegistry {
    plugins: HashMap<String, Arc<dyn ComputedField>>,
}

impl std::fmt::Debug for ComputedFieldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.plugins.keys().collect();
        names.sort();
        f.debug_struct("ComputedFieldRegistry")
            .field("plugins", &names)
            .finish()
    }
}

impl ComputedFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `concat`, `coalesce` and `sum`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("concat", Concat);
        registry.register("coalesce", Coalesce);
        registry.register("sum", Sum);
        registry
    }

    /// Add or replace a plugin
    pub fn register(&mut self, name: impl Into<String>, plugin: impl ComputedField + 'static) {
        self.plugins.insert(name.into(), Arc::new(plugin));
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, plugin: F)
    where
        F: Fn(&str, &[String]) -> Option<FieldValue> + Send + Sync + 'static,
    {
        self.register(name, plugin);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Bind each entry to its plugin
    pub fn resolve(&self, specs: Vec<ComputedFieldSpec>) -> Result<ComputedFields> {
        let mut entries = Vec::with_capacity(specs.len());

        for spec in specs {
            let plugin = self.plugins.get(&spec.plugin).cloned().ok_or_else(|| {
                DocloaderError::computed_field(
                    format!("{}={}(...)", spec.target, spec.plugin),
                    format!("no plugin named '{}' is registered", spec.plugin),
                )
            })?;
            entries.push((spec, plugin));
        }

        Ok(ComputedFields { entries })
    }
}

/// Computed fields bound to their plugins, ready to apply to documents
#[derive(Clone, Default)]
pub struct ComputedFields {
    entries: Vec<(ComputedFieldSpec, Arc<dyn ComputedField>)>,
}

impl std::fmt::Debug for ComputedFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(spec, _)| spec))
            .finish()
    }
}

impl ComputedFields {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Run every computed field, in configured order, against `record`.
    ///
    /// Later entries see the values written by earlier ones. The result is
    /// written as an update unless the target is `unique_key_field`.
    pub fn apply(&self, record: &mut OutputRecord, unique_key_field: &str) {
        for (spec, plugin) in &self.entries {
            let sources: Vec<String> = spec
                .sources
                .iter()
                .map(|name| record.value(name).map(FieldValue::to_string).unwrap_or_default())
                .collect();

            match plugin.compute(&spec.target, &sources) {
                Some(value) if spec.target.eq_ignore_ascii_case(unique_key_field) => {
                    record.set_bare(&spec.target, value)
                },
                Some(value) => record.set_update(&spec.target, value),
                None => {
                    debug!(target_field = %spec.target, plugin = %spec.plugin, "Computed field produced no value")
                },
            }
        }
    }
}
