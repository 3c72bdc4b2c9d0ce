//! Field and choice mapping tables.
//!
//! # Design
//! Emarsys addresses contact fields and their choices by numeric ids. The
//! table lets callers use symbolic names instead (`email` rather than `3`)
//! and translates in both directions. It is owned by one client; mutation
//! takes `&mut self`, so sharing a client across threads means wrapping it
//! in a lock.
//!
//! Ids arrive as integers or digit strings depending on where they come
//! from. They are normalized to `i64` on the way in (`FieldRef::parse`,
//! `add_choices_mapping`) and compared as integers afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::ClientError;

/// Field names that bypass the mapping table.
pub const SYSTEM_FIELDS: [&str; 4] = ["key_id", "id", "contacts", "uid"];

/// `symbolic name -> field id`
pub type FieldMapping = BTreeMap<String, i64>;

/// `field symbolic name -> (choice label -> choice id)`
pub type ChoiceMapping = BTreeMap<String, BTreeMap<String, i64>>;

/// A field as a caller refers to it: by numeric id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Numeric(i64),
    Symbolic(String),
}

impl FieldRef {
    /// Digit-only strings are numeric ids; everything else is a name.
    pub fn parse(key: &str) -> Self {
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = key.parse::<i64>() {
                return FieldRef::Numeric(id);
            }
        }
        FieldRef::Symbolic(key.to_string())
    }
}

impl From<i64> for FieldRef {
    fn from(id: i64) -> Self {
        FieldRef::Numeric(id)
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Symbolic(name.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::Symbolic(name)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Numeric(id) => write!(f, "{id}"),
            FieldRef::Symbolic(name) => f.write_str(name),
        }
    }
}

/// Result of resolving a field name for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKey {
    Id(i64),
    /// One of `SYSTEM_FIELDS`, passed through untouched.
    System(String),
}

impl FieldKey {
    pub fn id(&self) -> Option<i64> {
        match self {
            FieldKey::Id(id) => Some(*id),
            FieldKey::System(_) => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Id(id) => write!(f, "{id}"),
            FieldKey::System(name) => f.write_str(name),
        }
    }
}

/// Result of a reverse choice lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceRef {
    Label(String),
    /// No label matched; the id is echoed back.
    Id(i64),
}

impl fmt::Display for ChoiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceRef::Label(label) => f.write_str(label),
            ChoiceRef::Id(id) => write!(f, "{id}"),
        }
    }
}

pub fn is_system_field(name: &str) -> bool {
    SYSTEM_FIELDS.contains(&name)
}

/// First name (in key order) mapped to `id`.
pub(crate) fn reverse_lookup(fields: &FieldMapping, id: i64) -> Option<&str> {
    fields
        .iter()
        .find(|(_, value)| **value == id)
        .map(|(name, _)| name.as_str())
}

/// Bidirectional field/choice dictionary owned by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    fields: FieldMapping,
    choices: ChoiceMapping,
}

impl MappingTable {
    pub fn new(fields: FieldMapping, choices: ChoiceMapping) -> Self {
        Self { fields, choices }
    }

    pub fn fields(&self) -> &FieldMapping {
        &self.fields
    }

    pub fn choices(&self) -> &ChoiceMapping {
        &self.choices
    }

    /// Merge `additions` into the field mapping; existing names are overwritten.
    pub fn add_fields_mapping<I, K>(&mut self, additions: I)
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        for (name, id) in additions {
            let name = name.into();
            trace!(field = %name, id, "adding field mapping");
            self.fields.insert(name, id);
        }
    }

    /// Merge choices for one field, creating its choice map if needed.
    pub fn add_field_choices<I, K>(&mut self, field: impl Into<String>, choices: I)
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        let entry = self.choices.entry(field.into()).or_default();
        entry.extend(choices.into_iter().map(|(label, id)| (label.into(), id)));
    }

    /// Merge a `{field: {label: id}}` JSON object into the choice mapping.
    ///
    /// Fields whose value is not an object are ignored, as are choices whose
    /// id is neither an integer nor a digit string.
    pub fn add_choices_mapping(&mut self, additions: &Map<String, Value>) {
        for (field, choices) in additions {
            let Value::Object(choices) = choices else {
                trace!(field = %field, "ignoring non-object choice mapping");
                continue;
            };
            let parsed: Vec<(String, i64)> = choices
                .iter()
                .filter_map(|(label, id)| json_id(id).map(|id| (label.clone(), id)))
                .collect();
            self.add_field_choices(field.clone(), parsed);
        }
    }

    /// Resolve a symbolic field name to the key used on the wire.
    pub fn field_id(&self, name: &str) -> Result<FieldKey, ClientError> {
        if is_system_field(name) {
            return Ok(FieldKey::System(name.to_string()));
        }
        self.fields
            .get(name)
            .map(|id| FieldKey::Id(*id))
            .ok_or_else(|| ClientError::FieldNotFound {
                field: name.to_string(),
            })
    }

    /// Reverse lookup; unmapped ids are echoed back.
    pub fn field_name(&self, id: i64) -> FieldRef {
        match reverse_lookup(&self.fields, id) {
            Some(name) => FieldRef::Symbolic(name.to_string()),
            None => FieldRef::Numeric(id),
        }
    }

    pub fn choice_id(&self, field: &str, choice: &str) -> Result<i64, ClientError> {
        let choices = self
            .choices
            .get(field)
            .ok_or_else(|| ClientError::ChoiceFieldNotFound {
                field: field.to_string(),
                choice: choice.to_string(),
            })?;
        choices
            .get(choice)
            .copied()
            .ok_or_else(|| ClientError::ChoiceNotFound {
                choice: choice.to_string(),
                field: field.to_string(),
            })
    }

    /// Reverse choice lookup.
    ///
    /// A numeric field reference is first resolved to its symbolic name and
    /// the choice map is indexed by that name. When no label carries
    /// `choice_id` the id itself is returned.
    pub fn choice_name(
        &self,
        field: impl Into<FieldRef>,
        choice_id: i64,
    ) -> Result<ChoiceRef, ClientError> {
        let field = field.into();
        let key = match &field {
            FieldRef::Numeric(id) => self.field_name(*id).to_string(),
            FieldRef::Symbolic(name) => name.clone(),
        };
        let choices = self
            .choices
            .get(&key)
            .ok_or_else(|| ClientError::ChoiceFieldNotFound {
                field: field.to_string(),
                choice: choice_id.to_string(),
            })?;

        Ok(choices
            .iter()
            .find(|(_, id)| **id == choice_id)
            .map(|(label, _)| ChoiceRef::Label(label.clone()))
            .unwrap_or(ChoiceRef::Id(choice_id)))
    }

    /// Replace every key of `record` with its wire form.
    ///
    /// Digit-only keys pass through as ids; names are resolved through
    /// `field_id` and the first unknown name aborts the whole record.
    pub fn map_fields_to_ids(
        &self,
        record: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ClientError> {
        let mut mapped = Map::with_capacity(record.len());
        for (key, value) in record {
            let wire_key = match FieldRef::parse(key) {
                FieldRef::Numeric(id) => id.to_string(),
                FieldRef::Symbolic(name) => self.field_id(&name)?.to_string(),
            };
            mapped.insert(wire_key, value.clone());
        }
        Ok(mapped)
    }

    /// Resolve each record of a `contacts` batch, leaving the rest of the
    /// body as it is.
    pub fn map_contacts(&self, body: &Map<String, Value>) -> Result<Map<String, Value>, ClientError> {
        let Some(Value::Array(contacts)) = body.get("contacts") else {
            return Ok(body.clone());
        };

        let mapped = contacts
            .iter()
            .map(|contact| match contact {
                Value::Object(record) => self.map_fields_to_ids(record).map(Value::Object),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut body = body.clone();
        body.insert("contacts".to_string(), Value::Array(mapped));
        Ok(body)
    }

    /// Full pre-pass for a contact write: the `contacts` batch first, then
    /// the top-level keys.
    pub fn map_contact_body(&self, body: &Map<String, Value>) -> Result<Map<String, Value>, ClientError> {
        let body = self.map_contacts(body)?;
        self.map_fields_to_ids(&body)
    }
}

/// Integer id from a JSON number or digit string.
pub(crate) fn json_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
