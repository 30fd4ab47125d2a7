//! Named, parameterized XML fragment templates.
//!
//! Each template is a pure function writing tags through an [`XmlEmitter`].
//! The registry ships with the built-in wire-compatible templates and allows
//! later registrations to overwrite them.

use std::collections::HashMap;

use serde_json::Value;

use crate::Attributes;
use crate::error::{EloquaError, Result};
use crate::model::RemoteType;
use crate::naming::Group;
use crate::response::value_text;
use crate::xml::emitter::XmlEmitter;

/// Argument shapes accepted by templates.
#[derive(Debug, Clone)]
pub enum TemplateArgs {
    ObjectType(RemoteType),
    Array(Vec<Value>),
    IntArray(Vec<Value>),
    Fields {
        group: Group,
        attributes: Attributes,
    },
    Dynamic {
        group: Group,
        object_type: RemoteType,
        id: Option<i64>,
        attributes: Attributes,
    },
    Object {
        group: Group,
        object_type: RemoteType,
        id: i64,
    },
}

pub type TemplateFn = Box<dyn Fn(&mut XmlEmitter, &TemplateArgs) -> Result<()> + Send + Sync>;

pub struct TemplateRegistry {
    templates: HashMap<String, TemplateFn>,
}

impl TemplateRegistry {
    /// An empty registry with no templates at all.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Register `template` under `name`; redefinition overwrites.
    pub fn define(&mut self, name: impl Into<String>, template: TemplateFn) {
        self.templates.insert(name.into(), template);
    }

    /// Look up a registered template.
    pub fn render(&self, name: &str) -> Result<&TemplateFn> {
        self.templates
            .get(name)
            .ok_or_else(|| EloquaError::TemplateNotFound(name.to_string()))
    }

    /// Immediately invoke the named template against `xml`.
    pub fn apply(&self, xml: &mut XmlEmitter, name: &str, args: &TemplateArgs) -> Result<()> {
        self.render(name)?(xml, args)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

impl Default for TemplateRegistry {
    /// Registry preloaded with the built-in request-body templates.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.define(
            "object_type",
            Box::new(|xml, args| match args {
                TemplateArgs::ObjectType(object_type) => {
                    object_type_template(xml, object_type);
                    Ok(())
                }
                _ => Err(shape_error("object_type")),
            }),
        );
        registry.define(
            "array",
            Box::new(|xml, args| match args {
                TemplateArgs::Array(values) => {
                    array_template(xml, values);
                    Ok(())
                }
                _ => Err(shape_error("array")),
            }),
        );
        registry.define(
            "int_array",
            Box::new(|xml, args| match args {
                TemplateArgs::IntArray(values) => {
                    int_array_template(xml, values);
                    Ok(())
                }
                _ => Err(shape_error("int_array")),
            }),
        );
        registry.define(
            "fields",
            Box::new(|xml, args| match args {
                TemplateArgs::Fields { group, attributes } => {
                    fields_template(xml, *group, attributes)
                }
                _ => Err(shape_error("fields")),
            }),
        );
        registry.define(
            "dynamic",
            Box::new(|xml, args| match args {
                TemplateArgs::Dynamic {
                    group,
                    object_type,
                    id,
                    attributes,
                } => dynamic_template(xml, *group, object_type, *id, attributes),
                _ => Err(shape_error("dynamic")),
            }),
        );
        registry.define(
            "object",
            Box::new(|xml, args| match args {
                TemplateArgs::Object {
                    group,
                    object_type,
                    id,
                } => object_template(xml, *group, object_type, *id),
                _ => Err(shape_error("object")),
            }),
        );
        registry
    }
}

fn shape_error(name: &str) -> EloquaError {
    EloquaError::InvalidArgument(format!("wrong argument shape for template '{}'", name))
}

/// `<ID>`, `<Name>`, `<Type>` children of an object type descriptor,
/// in that fixed order.
fn object_type_template(xml: &mut XmlEmitter, object_type: &RemoteType) {
    xml.text_element("ID", &object_type.id.to_string());
    xml.text_element("Name", &object_type.name);
    xml.text_element("Type", &object_type.type_name);
}

/// `<arr:string>` or `<arr:int>` per value. Only actual numeric values take
/// the int tag; numeric-looking strings stay strings.
fn array_template(xml: &mut XmlEmitter, values: &[Value]) {
    for value in values {
        match value {
            Value::Number(n) => xml.text_element_ns("arr", "int", &n.to_string()),
            other => xml.text_element_ns("arr", "string", &value_text(other)),
        }
    }
}

/// `<arr:int>` per value after integer coercion. Strings that do not parse,
/// or parse to zero, are silently skipped; actual numbers always pass.
fn int_array_template(xml: &mut XmlEmitter, values: &[Value]) {
    for value in values {
        let coerced = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok().filter(|n| *n != 0),
            _ => None,
        };
        if let Some(n) = coerced {
            xml.text_element_ns("arr", "int", &n.to_string());
        }
    }
}

/// One `{Group}Fields` container per attribute pair, each holding
/// `<InternalName>` and `<Value>`.
fn fields_template(xml: &mut XmlEmitter, group: Group, attributes: &Attributes) -> Result<()> {
    for (attribute, value) in attributes {
        xml.element(group.fields_tag(), |xml| {
            xml.text_element("InternalName", attribute);
            xml.text_element("Value", &value_text(value));
            Ok(())
        })?;
    }
    Ok(())
}

/// Dynamic object body: `<{Group}Type>` wrapping the object type, then the
/// field value collection, then `<Id>` only when an id is present.
fn dynamic_template(
    xml: &mut XmlEmitter,
    group: Group,
    object_type: &RemoteType,
    id: Option<i64>,
    attributes: &Attributes,
) -> Result<()> {
    xml.element(group.type_tag(), |xml| {
        object_type_template(xml, object_type);
        Ok(())
    })?;
    xml.element("FieldValueCollection", |xml| {
        fields_template(xml, group, attributes)
    })?;
    if let Some(id) = id {
        xml.text_element("Id", &id.to_string());
    }
    Ok(())
}

/// Association payload member: `<{group}>` wrapping `<{Group}Type>` and `<Id>`.
fn object_template(xml: &mut XmlEmitter, group: Group, object_type: &RemoteType, id: i64) -> Result<()> {
    xml.element(group.as_str(), |xml| {
        xml.element(group.type_tag(), |xml| {
            object_type_template(xml, object_type);
            Ok(())
        })?;
        xml.text_element("Id", &id.to_string());
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emit(name: &str, args: TemplateArgs) -> String {
        let registry = TemplateRegistry::default();
        let mut xml = XmlEmitter::new();
        registry.apply(&mut xml, name, &args).unwrap();
        xml.into_string()
    }

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_object_type_emits_fixed_order() {
        let output = emit(
            "object_type",
            TemplateArgs::ObjectType(RemoteType::new("Contact")),
        );
        assert_eq!(
            output,
            "<ID>0</ID><Name>Contact</Name><Type>Base</Type>"
        );
    }

    #[test]
    fn test_array_only_numbers_take_int_tag() {
        let output = emit(
            "array",
            TemplateArgs::Array(vec![json!(1), json!("string"), json!("1"), json!("string")]),
        );
        assert_eq!(
            output,
            "<arr:int>1</arr:int><arr:string>string</arr:string>\
             <arr:string>1</arr:string><arr:string>string</arr:string>"
        );
    }

    #[test]
    fn test_int_array_drops_non_numeric_strings() {
        let output = emit(
            "int_array",
            TemplateArgs::IntArray(vec![json!(1), json!("ouch"), json!(2), json!("wow"), json!("3")]),
        );
        assert_eq!(
            output,
            "<arr:int>1</arr:int><arr:int>2</arr:int><arr:int>3</arr:int>"
        );
    }

    #[test]
    fn test_int_array_keeps_actual_zero() {
        let output = emit("int_array", TemplateArgs::IntArray(vec![json!(0), json!("0")]));
        assert_eq!(output, "<arr:int>0</arr:int>");
    }

    #[test]
    fn test_fields_wraps_each_pair_in_group_container() {
        let output = emit(
            "fields",
            TemplateArgs::Fields {
                group: Group::Entity,
                attributes: attrs(&[("C_EmailAddress", json!("wow@example.com"))]),
            },
        );
        assert_eq!(
            output,
            "<EntityFields><InternalName>C_EmailAddress</InternalName>\
             <Value>wow@example.com</Value></EntityFields>"
        );
    }

    #[test]
    fn test_dynamic_omits_id_when_absent() {
        let output = emit(
            "dynamic",
            TemplateArgs::Dynamic {
                group: Group::Entity,
                object_type: RemoteType::new("Contact"),
                id: None,
                attributes: attrs(&[("C_EmailAddress", json!("create"))]),
            },
        );
        assert!(output.starts_with("<EntityType><ID>0</ID>"));
        assert!(output.contains("<FieldValueCollection>"));
        assert!(!output.contains("<Id>"));
    }

    #[test]
    fn test_dynamic_includes_id_when_present() {
        let output = emit(
            "dynamic",
            TemplateArgs::Dynamic {
                group: Group::Asset,
                object_type: RemoteType::new("ContactGroup"),
                id: Some(1),
                attributes: Attributes::new(),
            },
        );
        assert!(output.starts_with("<AssetType>"));
        assert!(output.ends_with("<Id>1</Id>"));
    }

    #[test]
    fn test_object_wraps_type_and_id_in_group_tag() {
        let output = emit(
            "object",
            TemplateArgs::Object {
                group: Group::Entity,
                object_type: RemoteType::new("Contact"),
                id: 1,
            },
        );
        assert_eq!(
            output,
            "<entity><EntityType><ID>0</ID><Name>Contact</Name><Type>Base</Type>\
             </EntityType><Id>1</Id></entity>"
        );
    }

    #[test]
    fn test_default_registry_contains_builtins() {
        let registry = TemplateRegistry::default();
        for name in ["object_type", "array", "int_array", "fields", "dynamic", "object"] {
            assert!(registry.contains(name), "missing builtin '{}'", name);
        }
        assert!(!registry.contains("missing"));
        assert!(!TemplateRegistry::empty().contains("array"));
    }

    #[test]
    fn test_unregistered_template_errors() {
        let registry = TemplateRegistry::default();
        let mut xml = XmlEmitter::new();
        let err = registry
            .apply(&mut xml, "missing", &TemplateArgs::Array(vec![]))
            .unwrap_err();
        assert!(matches!(err, EloquaError::TemplateNotFound(_)));
    }

    #[test]
    fn test_redefinition_overwrites() {
        let mut registry = TemplateRegistry::default();
        registry.define(
            "array",
            Box::new(|xml, _| {
                xml.text_element("replaced", "yes");
                Ok(())
            }),
        );
        let mut xml = XmlEmitter::new();
        registry
            .apply(&mut xml, "array", &TemplateArgs::Array(vec![]))
            .unwrap();
        assert_eq!(xml.into_string(), "<replaced>yes</replaced>");
    }
}
