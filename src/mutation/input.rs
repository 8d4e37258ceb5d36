//! Typed write input
//!
//! An [`EntityInput`] is an ordered map of field names to values plus an optional
//! identifier. Whether a value is a scalar, a nested element or a reference is
//! resolved against the schema by the upsert engine.

use crate::graph::PropertyValue;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(String),

    #[error("Field 'id' must be a string")]
    InvalidId,
}

/// One field value of an input tree
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// Scalar value, or an identifier when given for a relation field
    Scalar(PropertyValue),
    /// Nested element
    Object(EntityInput),
    List(Vec<InputValue>),
}

impl InputValue {
    /// Elements of a relation value (a non-list counts as one element)
    pub fn elements(&self) -> Vec<&InputValue> {
        match self {
            InputValue::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Scalar form of the value; lists of scalars become arrays
    pub fn to_property(&self) -> Option<PropertyValue> {
        match self {
            InputValue::Scalar(value) => Some(value.clone()),
            InputValue::Object(_) => None,
            InputValue::List(items) => items
                .iter()
                .map(InputValue::to_property)
                .collect::<Option<Vec<_>>>()
                .map(PropertyValue::Array),
        }
    }

    fn from_json(value: serde_json::Value) -> Result<Self, InputError> {
        match value {
            serde_json::Value::Object(_) => Ok(InputValue::Object(EntityInput::try_from(value)?)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(InputValue::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(InputValue::List),
            scalar => Ok(InputValue::Scalar(
                PropertyValue::from_json(&scalar).unwrap_or(PropertyValue::Null),
            )),
        }
    }
}

/// Write request for one entity and its nested relations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityInput {
    pub id: Option<String>,
    pub values: IndexMap<String, InputValue>,
}

impl EntityInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input addressing an existing entity
    pub fn with_id(id: impl Into<String>) -> Self {
        EntityInput {
            id: Some(id.into()),
            values: IndexMap::new(),
        }
    }

    /// Set a scalar field
    pub fn set(mut self, field: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.values
            .insert(field.into(), InputValue::Scalar(value.into()));
        self
    }

    /// Set a field to null
    pub fn clear(mut self, field: impl Into<String>) -> Self {
        self.values
            .insert(field.into(), InputValue::Scalar(PropertyValue::Null));
        self
    }

    /// Append a nested element to a relation field
    pub fn child(self, field: impl Into<String>, child: EntityInput) -> Self {
        self.push(field.into(), InputValue::Object(child))
    }

    /// Append a reference to an existing entity to a relation field
    pub fn reference(self, field: impl Into<String>, id: impl Into<String>) -> Self {
        self.push(field.into(), InputValue::Scalar(PropertyValue::String(id.into())))
    }

    fn push(mut self, field: String, value: InputValue) -> Self {
        match self.values.get_mut(&field) {
            Some(InputValue::List(items)) => items.push(value),
            Some(existing) => {
                let previous = std::mem::replace(existing, InputValue::List(Vec::new()));
                *existing = InputValue::List(vec![previous, value]);
            }
            None => {
                self.values.insert(field, InputValue::List(vec![value]));
            }
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&InputValue> {
        self.values.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<serde_json::Value> for EntityInput {
    type Error = InputError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let map = match value {
            serde_json::Value::Object(map) => map,
            other => return Err(InputError::NotAnObject(other.to_string())),
        };

        let mut input = EntityInput::new();
        for (key, value) in map {
            if key == "id" {
                input.id = match value {
                    serde_json::Value::String(id) => Some(id),
                    serde_json::Value::Null => None,
                    _ => return Err(InputError::InvalidId),
                };
                continue;
            }
            input.values.insert(key, InputValue::from_json(value)?);
        }
        Ok(input)
    }
}

impl<'de> Deserialize<'de> for EntityInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        EntityInput::try_from(value).map_err(serde::de::Error::custom)
    }
}
