//! Name derivation rules for groups, service methods, tags and keys.
//!
//! Eloqua exposes one generic CRUD surface per object group. For the `entity`
//! group the service method is the bare verb (`create`, `retrieve`, ...);
//! for any other group the group name is appended (`create_asset`). Result
//! keys follow the same pattern but insert the group token into the middle
//! of a two-part snake key (`create_result` -> `create_asset_result`).
//! Everything here is a total function over the closed [`Group`] enum.

/// Prefix Eloqua uses for contact-level remote field names (`C_EmailAddress`).
pub const REMOTE_ATTRIBUTE_PREFIX: &str = "C_";

/// Coarse remote-object family. Determines XML tag and service-method
/// naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Entity,
    Asset,
}

impl Group {
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Entity => "entity",
            Group::Asset => "asset",
        }
    }

    pub fn capitalized(&self) -> &'static str {
        match self {
            Group::Entity => "Entity",
            Group::Asset => "Asset",
        }
    }

    /// Request collection wrapper tag: `entities` / `assets`.
    pub fn collection_tag(&self) -> &'static str {
        match self {
            Group::Entity => "entities",
            Group::Asset => "assets",
        }
    }

    /// Dynamic-object wrapper tag: `DynamicEntity` / `DynamicAsset`.
    pub fn dynamic_tag(&self) -> &'static str {
        match self {
            Group::Entity => "DynamicEntity",
            Group::Asset => "DynamicAsset",
        }
    }

    /// Object type tag as used inside dynamic objects: `EntityType`.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Group::Entity => "EntityType",
            Group::Asset => "AssetType",
        }
    }

    /// Object type tag as used for retrieve/delete/describe: `entityType`.
    pub fn type_tag_lower(&self) -> &'static str {
        match self {
            Group::Entity => "entityType",
            Group::Asset => "assetType",
        }
    }

    /// Field container tag inside a field value collection: `EntityFields`.
    pub fn fields_tag(&self) -> &'static str {
        match self {
            Group::Entity => "EntityFields",
            Group::Asset => "AssetFields",
        }
    }

    /// Response key holding the dynamic object: `dynamic_entity`.
    pub fn dynamic_key(&self) -> &'static str {
        match self {
            Group::Entity => "dynamic_entity",
            Group::Asset => "dynamic_asset",
        }
    }

    /// Response key holding the field list: `entity_fields`.
    pub fn fields_key(&self) -> &'static str {
        match self {
            Group::Entity => "entity_fields",
            Group::Asset => "asset_fields",
        }
    }

    /// Response key the describe operation nests field metadata under.
    pub fn field_definition_key(&self) -> &'static str {
        match self {
            Group::Entity => "dynamic_entity_field_definition",
            Group::Asset => "dynamic_asset_field_definition",
        }
    }
}

/// Service method name for a CRUD verb: bare verb for entities,
/// `verb_asset` for assets.
pub fn service_method(group: Group, verb: &str) -> String {
    match group {
        Group::Entity => verb.to_string(),
        _ => format!("{}_{}", verb, group.as_str()),
    }
}

/// Result key for a two-part snake key: `create_result` stays unchanged for
/// entities, becomes `create_asset_result` for assets.
pub fn result_key(group: Group, key: &str) -> String {
    match group {
        Group::Entity => key.to_string(),
        _ => {
            let mut parts = key.splitn(2, '_');
            let head = parts.next().unwrap_or_default();
            let tail = parts.next().unwrap_or_default();
            format!("{}_{}_{}", head, group.as_str(), tail)
        }
    }
}

/// PascalCase/camelCase to lower_snake_case.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_ascii_lowercase();
            if i > 0 && chars[i - 1] != '_' && (prev_lower || (chars[i - 1].is_ascii_uppercase() && next_lower)) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// snake_case to PascalCase, used to derive wire operation tags
/// (`create_asset` -> `CreateAsset`).
pub fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Default derivation of a local attribute name from a remote field name:
/// strip the fixed remote prefix, then snake-case the remainder.
pub fn derive_local_name(remote: &str) -> String {
    let stripped = remote.strip_prefix(REMOTE_ATTRIBUTE_PREFIX).unwrap_or(remote);
    to_snake_case(stripped)
}
