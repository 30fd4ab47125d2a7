//! Bidirectional mapping between local attribute names and remote field names.
//!
//! Remote fields follow a fixed prefix plus PascalCase (`C_EmailAddress`),
//! local attributes are lower_snake_case (`email_address`). An explicit
//! override table takes precedence in both directions; everything else is
//! derived. A derived name is only reversible through the per-batch snapshot
//! captured when remote input was localized, so the snapshot records the
//! exact original remote key for every derived local name.

use std::collections::HashMap;

use crate::Attributes;
use crate::naming::derive_local_name;

#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    // remote field name -> local attribute name
    to_local: HashMap<String, String>,
    // local attribute name -> remote field name
    to_remote: HashMap<String, String>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an explicit remote<->local association. Both tables update
    /// together; a later call for the same pair overrides the earlier one.
    pub fn map(&mut self, remote: impl Into<String>, local: impl Into<String>) {
        let remote = remote.into();
        let local = local.into();
        self.to_local.insert(remote.clone(), local.clone());
        self.to_remote.insert(local, remote);
    }

    /// Local name for a remote field: the explicit mapping when present,
    /// otherwise the prefix-strip + snake-case derivation.
    pub fn local_name(&self, remote: &str) -> String {
        match self.to_local.get(remote) {
            Some(local) => local.clone(),
            None => derive_local_name(remote),
        }
    }

    /// Remote field for a local name: the explicit mapping when present,
    /// otherwise the input unchanged.
    pub fn remote_name(&self, local: &str) -> String {
        match self.to_remote.get(local) {
            Some(remote) => remote.clone(),
            None => local.to_string(),
        }
    }

    /// The local -> remote table, cloned by records as the seed for their
    /// per-instance reverse snapshot.
    pub fn remote_names(&self) -> &HashMap<String, String> {
        &self.to_remote
    }

    /// Convert a remote-keyed attribute batch to local keys, recording the
    /// original remote key of every input into `snapshot` so unmapped
    /// attributes still round-trip on write-back. An existing snapshot entry
    /// wins, so input already under a local name never displaces the
    /// declared remote key.
    pub fn localize_batch(
        &self,
        attributes: &Attributes,
        snapshot: &mut HashMap<String, String>,
    ) -> Attributes {
        let mut out = Attributes::new();
        for (remote, value) in attributes {
            let local = self.local_name(remote);
            snapshot
                .entry(local.clone())
                .or_insert_with(|| remote.clone());
            out.insert(local, value.clone());
        }
        out
    }
}

/// Convert a local-keyed attribute batch back to remote keys through a
/// reverse snapshot; keys missing from the snapshot pass through unchanged.
pub fn remoteize_batch(attributes: &Attributes, snapshot: &HashMap<String, String>) -> Attributes {
    let mut out = Attributes::new();
    for (local, value) in attributes {
        let remote = snapshot
            .get(local)
            .cloned()
            .unwrap_or_else(|| local.clone());
        out.insert(remote, value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_mapping_round_trips() {
        let mut map = AttributeMap::new();
        map.map("C_EmailAddress", "email");
        assert_eq!(map.local_name("C_EmailAddress"), "email");
        assert_eq!(map.remote_name("email"), "C_EmailAddress");
        assert_eq!(map.local_name(&map.remote_name("email")), "email");
    }

    #[test]
    fn test_unmapped_remote_key_derives_local_name() {
        let map = AttributeMap::new();
        assert_eq!(map.local_name("C_FirstName"), "first_name");
        assert_eq!(map.local_name("ContactID"), "contact_id");
    }

    #[test]
    fn test_unmapped_local_key_passes_through() {
        let map = AttributeMap::new();
        assert_eq!(map.remote_name("first_name"), "first_name");
    }

    #[test]
    fn test_batch_snapshot_makes_derived_names_reversible() {
        let map = AttributeMap::new();
        let mut snapshot = map.remote_names().clone();

        let mut input = Attributes::new();
        input.insert("C_FirstName".to_string(), json!("wow"));
        let localized = map.localize_batch(&input, &mut snapshot);
        assert_eq!(localized.get("first_name"), Some(&json!("wow")));

        let restored = remoteize_batch(&localized, &snapshot);
        assert_eq!(restored.get("C_FirstName"), Some(&json!("wow")));
    }

    #[test]
    fn test_local_keyed_input_keeps_seeded_snapshot() {
        let mut map = AttributeMap::new();
        map.map("C_EmailAddress", "email");
        let mut snapshot = map.remote_names().clone();

        let mut input = Attributes::new();
        input.insert("email".to_string(), json!("wow@example.com"));
        let localized = map.localize_batch(&input, &mut snapshot);

        let restored = remoteize_batch(&localized, &snapshot);
        assert_eq!(restored.get("C_EmailAddress"), Some(&json!("wow@example.com")));
    }

    #[test]
    fn test_later_map_call_overrides_earlier() {
        let mut map = AttributeMap::new();
        map.map("C_EmailAddress", "email");
        map.map("C_BetterEmail", "email");
        assert_eq!(map.remote_name("email"), "C_BetterEmail");
    }

    #[test]
    fn test_clone_is_copy_isolated() {
        let mut parent = AttributeMap::new();
        parent.map("C_EmailAddress", "email");

        let mut child = parent.clone();
        child.map("C_Company", "company");
        parent.map("C_FirstName", "first_name");

        assert_eq!(parent.remote_name("company"), "company");
        assert_eq!(child.remote_name("first_name"), "first_name");
        assert_eq!(child.remote_name("company"), "C_Company");
        assert_eq!(parent.remote_name("first_name"), "C_FirstName");
    }
}
