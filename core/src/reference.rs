//! Bundled field and choice reference data.
//!
//! Both datasets are compiled into the library. `fields.json` has the shape of
//! the `data` member of a `GET field` reply; `choices.json` maps a field id to
//! the `data` member of its `GET field/{id}/choice` reply.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::mapping::{json_id, reverse_lookup, ChoiceMapping, FieldMapping, FieldRef};

const FIELDS_JSON: &str = include_str!("../data/fields.json");
const CHOICES_JSON: &str = include_str!("../data/choices.json");

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("malformed {dataset} reference data: {source}")]
    Malformed {
        dataset: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("choice \"{choice}\" of field \"{field}\" has a non-numeric id")]
    InvalidChoiceId { field: String, choice: String },
}

/// One entry of the field list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldRecord {
    pub id: i64,
    pub name: String,
    pub application_type: String,
    pub string_id: String,
}

/// One choice of an enumerated field. Emarsys sends the id as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceRecord {
    pub id: serde_json::Value,
    pub choice: String,
}

pub fn parse_fields(json: &str) -> Result<FieldMapping, ReferenceError> {
    let records: Vec<FieldRecord> =
        serde_json::from_str(json).map_err(|source| ReferenceError::Malformed {
            dataset: "fields",
            source,
        })?;
    Ok(records
        .into_iter()
        .map(|record| (record.string_id, record.id))
        .collect())
}

/// Parse a choice dataset, keying each field by its name in `fields` when
/// the key is a mapped numeric id.
pub fn parse_choices(json: &str, fields: &FieldMapping) -> Result<ChoiceMapping, ReferenceError> {
    let raw: BTreeMap<String, Vec<ChoiceRecord>> =
        serde_json::from_str(json).map_err(|source| ReferenceError::Malformed {
            dataset: "choices",
            source,
        })?;

    let mut mapping = ChoiceMapping::new();
    for (key, choices) in raw {
        let field = match FieldRef::parse(&key) {
            FieldRef::Numeric(id) => reverse_lookup(fields, id)
                .map(str::to_string)
                .unwrap_or(key),
            FieldRef::Symbolic(name) => name,
        };
        let entry = mapping.entry(field.clone()).or_default();
        for record in choices {
            let id = json_id(&record.id).ok_or_else(|| ReferenceError::InvalidChoiceId {
                field: field.clone(),
                choice: record.choice.clone(),
            })?;
            entry.insert(record.choice, id);
        }
    }
    Ok(mapping)
}

pub fn bundled_fields() -> Result<FieldMapping, ReferenceError> {
    parse_fields(FIELDS_JSON)
}

pub fn bundled_choices(fields: &FieldMapping) -> Result<ChoiceMapping, ReferenceError> {
    parse_choices(CHOICES_JSON, fields)
}
