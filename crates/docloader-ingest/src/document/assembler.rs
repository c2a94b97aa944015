//! Row to document assembly

use std::collections::HashSet;
use tracing::{error, warn};

use super::{OutputRecord, UniqueKeyLayout};
use crate::computed::ComputedFields;
use crate::field::{coerce, FieldSpecTable};

/// One input row; `None` marks a null cell
pub type Row = Vec<Option<String>>;

/// Builds one [`OutputRecord`] per input row.
///
/// Shared read-only by the pipeline; each call keeps its own key state.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    fields: FieldSpecTable,
    literals: FieldSpecTable,
    skip_fields: HashSet<String>,
    unique_key_field: String,
    key_layout: UniqueKeyLayout,
    computed: ComputedFields,
}

impl DocumentAssembler {
    pub fn new(fields: FieldSpecTable, unique_key_field: impl Into<String>) -> Self {
        Self {
            fields,
            literals: FieldSpecTable::default(),
            skip_fields: HashSet::new(),
            unique_key_field: unique_key_field.into(),
            key_layout: UniqueKeyLayout::default(),
            computed: ComputedFields::default(),
        }
    }

    pub fn with_literals(mut self, literals: FieldSpecTable) -> Self {
        self.literals = literals;
        self
    }

    /// Fields read for the unique key but not written to the document
    pub fn with_skip_fields(mut self, skip_fields: impl IntoIterator<Item = String>) -> Self {
        self.skip_fields = skip_fields.into_iter().collect();
        self
    }

    pub fn with_key_layout(mut self, key_layout: UniqueKeyLayout) -> Self {
        self.key_layout = key_layout;
        self
    }

    pub fn with_computed(mut self, computed: ComputedFields) -> Self {
        self.computed = computed;
        self
    }

    pub fn fields(&self) -> &FieldSpecTable {
        &self.fields
    }

    pub fn unique_key_field(&self) -> &str {
        &self.unique_key_field
    }

    fn is_key_field(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.unique_key_field)
    }

    /// Build the document for one row.
    ///
    /// Cells are matched to fields by position; missing trailing cells are
    /// treated as null. Returns `None` when the row cannot produce a
    /// complete unique key.
    pub fn assemble(&self, row: &[Option<String>], line_number: u64) -> Option<OutputRecord> {
        let mut record = OutputRecord::new();
        let mut key = self.key_layout.builder();

        for (index, spec) in self.fields.iter().enumerate() {
            let raw = match row.get(index).and_then(Option::as_deref) {
                Some(raw) if !raw.trim().is_empty() => raw,
                _ => continue,
            };

            let Some(value) = coerce(spec, Some(raw)) else {
                warn!(line = line_number, field = %spec.name(), "Dropping field with unusable value");
                continue;
            };

            key.add_field(spec.name(), value.clone());

            if self.skip_fields.contains(spec.name()) {
                continue;
            }
            if self.is_key_field(spec.name()) {
                record.set_bare(spec.name(), value);
            } else {
                record.set_update(spec.name(), value);
            }
        }

        for literal in &self.literals {
            if let Some(value) = literal.literal_value() {
                key.add_field(literal.name(), value.clone());
                record.set_update(literal.name(), value.clone());
            }
        }

        match key.render() {
            Ok(rendered) if !rendered.is_empty() => {
                record.set_bare(&self.unique_key_field, rendered.into());
            },
            Ok(_) => {},
            Err(err) => {
                error!(line = line_number, error = %err, "Skipping row");
                return None;
            },
        }

        self.computed.apply(&mut record, &self.unique_key_field);

        Some(record)
    }
}
