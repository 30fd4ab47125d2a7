//! Object definitions: one immutable descriptor per concrete remote type.
//!
//! Where the remote API thinks in "group + type", callers declare an
//! [`ObjectDefinition`] once per concrete type through the builder and share
//! it behind an `Arc`. Definitions compose: a builder can inherit an
//! existing definition's tables, and the copies are fully isolated from the
//! base afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::mapping::AttributeMap;
use crate::naming::Group;

/// Identifies a kind of remote object. With `id == 0` this is a type
/// descriptor; with `id > 0` it references a specific remote row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteType {
    pub name: String,
    pub type_name: String,
    pub id: i64,
}

impl RemoteType {
    /// Type descriptor with the default `Base` type and no instance id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: "Base".to_string(),
            id: 0,
        }
    }

    pub fn with_id(name: impl Into<String>, type_name: impl Into<String>, id: i64) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            id,
        }
    }
}

/// Registered value coercion for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Remote checkbox fields carry "Yes"/"No" strings; locally they are
    /// booleans. Unrecognized inputs pass through unchanged.
    BooleanCheckbox,
}

impl AttributeKind {
    /// Remote representation -> local value.
    pub fn import(&self, value: &Value) -> Value {
        match self {
            AttributeKind::BooleanCheckbox => match value {
                Value::String(s) if s.eq_ignore_ascii_case("yes") => Value::Bool(true),
                Value::String(s) if s.eq_ignore_ascii_case("no") => Value::Bool(false),
                other => other.clone(),
            },
        }
    }

    /// Local value -> remote representation.
    pub fn export(&self, value: &Value) -> Value {
        match self {
            AttributeKind::BooleanCheckbox => match value {
                Value::Bool(false) | Value::Null => Value::String("No".to_string()),
                _ => Value::String("Yes".to_string()),
            },
        }
    }
}

/// Immutable description of a concrete remote type: its group, type
/// descriptor, attribute mapping, value coercions and validation rules.
#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    name: String,
    group: Group,
    remote_type: RemoteType,
    primary_key: String,
    attribute_map: AttributeMap,
    attribute_types: HashMap<String, AttributeKind>,
    required: Vec<String>,
    accessible: Option<Vec<String>>,
}

impl ObjectDefinition {
    pub fn builder(name: impl Into<String>, group: Group) -> DefinitionBuilder {
        let name = name.into();
        DefinitionBuilder {
            remote_type: RemoteType::new(name.clone()),
            name,
            group,
            primary_key: "id".to_string(),
            attribute_map: AttributeMap::new(),
            attribute_types: HashMap::new(),
            required: Vec::new(),
            accessible: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn remote_type(&self) -> &RemoteType {
        &self.remote_type
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn attribute_map(&self) -> &AttributeMap {
        &self.attribute_map
    }

    pub fn attribute_types(&self) -> &HashMap<String, AttributeKind> {
        &self.attribute_types
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Mass-assignment allow-list; `None` means everything is assignable.
    pub fn accessible(&self) -> Option<&[String]> {
        self.accessible.as_deref()
    }
}

pub struct DefinitionBuilder {
    name: String,
    group: Group,
    remote_type: RemoteType,
    primary_key: String,
    attribute_map: AttributeMap,
    attribute_types: HashMap<String, AttributeKind>,
    required: Vec<String>,
    accessible: Option<Vec<String>>,
}

impl DefinitionBuilder {
    /// Start from an existing definition's tables. The copies are
    /// independent; mutating either side never affects the other.
    pub fn inherit(name: impl Into<String>, base: &ObjectDefinition) -> Self {
        Self {
            name: name.into(),
            group: base.group,
            remote_type: base.remote_type.clone(),
            primary_key: base.primary_key.clone(),
            attribute_map: base.attribute_map.clone(),
            attribute_types: base.attribute_types.clone(),
            required: base.required.clone(),
            accessible: base.accessible.clone(),
        }
    }

    pub fn remote_type(mut self, remote_type: RemoteType) -> Self {
        self.remote_type = remote_type;
        self
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    /// Explicit remote<->local attribute association.
    pub fn map(mut self, remote: impl Into<String>, local: impl Into<String>) -> Self {
        self.attribute_map.map(remote, local);
        self
    }

    /// Register a boolean-checkbox coercion for `attribute`.
    pub fn checkbox(mut self, attribute: impl Into<String>) -> Self {
        self.attribute_types
            .insert(attribute.into(), AttributeKind::BooleanCheckbox);
        self
    }

    /// Presence validation for `attribute`; checked by `save`.
    pub fn required(mut self, attribute: impl Into<String>) -> Self {
        self.required.push(attribute.into());
        self
    }

    /// Restrict mass assignment to the listed attributes.
    pub fn accessible(mut self, attributes: &[&str]) -> Self {
        self.accessible = Some(attributes.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn build(self) -> Arc<ObjectDefinition> {
        Arc::new(ObjectDefinition {
            name: self.name,
            group: self.group,
            remote_type: self.remote_type,
            primary_key: self.primary_key,
            attribute_map: self.attribute_map,
            attribute_types: self.attribute_types,
            required: self.required,
            accessible: self.accessible,
        })
    }
}
