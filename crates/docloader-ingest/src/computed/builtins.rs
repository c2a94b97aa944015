//! Plugins shipped with the loader

use super::ComputedField;
use crate::field::FieldValue;

/// Joins the source values with a single space
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

impl ComputedField for Concat {
    fn compute(&self, _target: &str, sources: &[String]) -> Option<FieldValue> {
        Some(FieldValue::String(sources.join(" ")))
    }
}

/// First source value that is not blank
#[derive(Debug, Clone, Copy, Default)]
pub struct Coalesce;

impl ComputedField for Coalesce {
    fn compute(&self, _target: &str, sources: &[String]) -> Option<FieldValue> {
        sources
            .iter()
            .find(|value| !value.trim().is_empty())
            .map(|value| FieldValue::String(value.clone()))
    }
}

/// Numeric sum of the sources; blank or non-numeric values count as zero
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl ComputedField for Sum {
    fn compute(&self, _target: &str, sources: &[String]) -> Option<FieldValue> {
        let total = sources
            .iter()
            .map(|value| value.trim().parse::<f64>().unwrap_or(0.0))
            .sum();
        Some(FieldValue::Double(total))
    }
}
