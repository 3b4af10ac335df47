//! Persona records.

use serde::{Deserialize, Serialize};

use crate::fields::{self, FieldMap};

/// A row of the persona table: an analytical viewpoint for the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaRecord {
    pub record_id: String,
    pub description: Option<String>,
}

impl PersonaRecord {
    pub fn from_fields(record_id: impl Into<String>, fields: &FieldMap) -> Self {
        Self {
            record_id: record_id.into(),
            description: fields::text_value(fields.get(fields::persona::DESCRIPTION)),
        }
    }
}
