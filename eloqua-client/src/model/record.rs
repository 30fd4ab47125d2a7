//! Records: attribute state, dirty tracking and persistence for one remote
//! object instance.
//!
//! A record pairs a shared [`ObjectDefinition`] with a live attribute map.
//! Attributes are stored under local names; every record carries its own
//! reverse snapshot so attributes whose remote names were derived rather
//! than declared still write back under the exact key the server sent.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::{Value, json};

use crate::Attributes;
use crate::error::{EloquaError, Result};
use crate::mapping::remoteize_batch;
use crate::model::{ObjectDefinition, RemoteType};
use crate::naming::Group;
use crate::response::{value_present, value_to_i64};
use crate::service::Service;

#[derive(Clone)]
pub struct RemoteRecord {
    definition: Arc<ObjectDefinition>,
    service: Service,
    attributes: Attributes,
    // local name -> original remote key, seeded from the definition and
    // extended whenever remote input is localized
    remote_keys: HashMap<String, String>,
    // local name -> value before the first unsaved change
    changed: HashMap<String, Value>,
    errors: HashMap<String, Vec<String>>,
    persisted: bool,
}

impl RemoteRecord {
    /// New unpersisted record. Input may mix local and remote keys; remote
    /// keys are localized and registered importers applied.
    pub fn new(
        definition: Arc<ObjectDefinition>,
        service: Service,
        attributes: Attributes,
    ) -> Self {
        Self::build(definition, service, attributes, false)
    }

    /// Record hydrated from a remote response; marked persisted.
    pub fn from_remote(
        definition: Arc<ObjectDefinition>,
        service: Service,
        attributes: Attributes,
    ) -> Self {
        Self::build(definition, service, attributes, true)
    }

    fn build(
        definition: Arc<ObjectDefinition>,
        service: Service,
        attributes: Attributes,
        persisted: bool,
    ) -> Self {
        let mut remote_keys = definition.attribute_map().remote_names().clone();
        let localized = definition
            .attribute_map()
            .localize_batch(&attributes, &mut remote_keys);

        let mut imported = Attributes::new();
        for (name, value) in localized {
            let value = match definition.attribute_types().get(&name) {
                Some(kind) => kind.import(&value),
                None => value,
            };
            imported.insert(name, value);
        }

        // a non-empty primary key also counts as persisted
        let persisted = persisted || value_present(imported.get(definition.primary_key()));

        Self {
            definition,
            service,
            attributes: imported,
            remote_keys,
            changed: HashMap::new(),
            errors: HashMap::new(),
            persisted,
        }
    }

    /// Retrieve a record by id. `None` when the server has no such object.
    pub async fn find(
        definition: Arc<ObjectDefinition>,
        service: Service,
        id: i64,
    ) -> Result<Option<Self>> {
        let found = service
            .find_object(definition.group(), definition.remote_type(), id)
            .await?;
        Ok(found.map(|attributes| Self::from_remote(definition.clone(), service.clone(), attributes)))
    }

    pub fn definition(&self) -> &ObjectDefinition {
        &self.definition
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Numeric primary key, when set.
    pub fn id(&self) -> Option<i64> {
        value_to_i64(self.attributes.get(self.definition.primary_key()))
    }

    pub fn persisted(&self) -> bool {
        self.persisted
    }

    pub fn new_record(&self) -> bool {
        !self.persisted
    }

    /// Current value of a local attribute, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Strict read: names in storage return their value, names known to the
    /// attribute map but unset read as `Null`, anything else errors.
    pub fn read(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(value.clone());
        }
        if self.remote_keys.contains_key(name) {
            return Ok(Value::Null);
        }
        Err(EloquaError::UnknownAttribute(name.to_string()))
    }

    /// Write a local attribute, tracking the change. Re-writing the original
    /// value clears the dirty entry again. Names absent from both storage
    /// and the attribute map are rejected, mirroring [`read`](Self::read).
    pub fn write(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if !self.attributes.contains_key(&name) && !self.remote_keys.contains_key(&name) {
            return Err(EloquaError::UnknownAttribute(name));
        }
        let previous = self.attributes.get(&name).cloned().unwrap_or(Value::Null);
        match self.changed.get(&name).cloned() {
            Some(original) if original == value => {
                self.changed.remove(&name);
            }
            Some(_) => {}
            None if previous != value => {
                self.changed.insert(name.clone(), previous);
            }
            None => {}
        }
        self.attributes.insert(name, value);
        Ok(())
    }

    /// Names with unsaved changes.
    pub fn changed(&self) -> Vec<&str> {
        self.changed.keys().map(String::as_str).collect()
    }

    pub fn is_changed(&self, name: &str) -> bool {
        self.changed.contains_key(name)
    }

    /// Run presence validation over the required attributes, repopulating
    /// [`errors`](Self::errors).
    pub fn valid(&mut self) -> bool {
        self.errors.clear();
        for name in self.definition.required() {
            if !value_present(self.attributes.get(name)) {
                self.errors
                    .entry(name.clone())
                    .or_default()
                    .push("can't be blank".to_string());
            }
        }
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    /// Validate, then create or update depending on persistence state.
    /// `Ok(false)` means validation failed; remote failures are errors.
    pub async fn save(&mut self) -> Result<bool> {
        if !self.valid() {
            debug!(
                "{} failed validation on {:?}",
                self.definition.name(),
                self.errors.keys().collect::<Vec<_>>()
            );
            return Ok(false);
        }
        if self.persisted {
            self.update().await
        } else {
            self.create().await
        }
    }

    /// Create the record remotely; on success the returned id is stored and
    /// the record becomes persisted and clean.
    pub async fn create(&mut self) -> Result<bool> {
        let attributes = self.export_attributes(false);
        let id = self
            .service
            .create_object(
                self.definition.group(),
                self.definition.remote_type(),
                attributes,
            )
            .await?;
        self.attributes
            .insert(self.definition.primary_key().to_string(), json!(id));
        self.persisted = true;
        self.changed.clear();
        Ok(true)
    }

    /// Push only the changed attributes; a clean record is a no-op.
    pub async fn update(&mut self) -> Result<bool> {
        let id = self.require_id()?;
        if self.changed.is_empty() {
            return Ok(true);
        }
        let attributes = self.export_attributes(true);
        let updated = self
            .service
            .update_object(
                self.definition.group(),
                self.definition.remote_type(),
                id,
                attributes,
            )
            .await?;
        if updated {
            self.changed.clear();
        }
        Ok(updated)
    }

    /// Mass-assign and save. Unless `bypass_security` is set, attributes
    /// outside the definition's accessible list are dropped.
    pub async fn update_attributes(
        &mut self,
        attributes: Attributes,
        bypass_security: bool,
    ) -> Result<bool> {
        for (name, value) in attributes {
            if !bypass_security && !self.assignable(&name) {
                warn!(
                    "dropping mass-assigned attribute '{}' not in the accessible list of {}",
                    name,
                    self.definition.name()
                );
                continue;
            }
            self.write(name, value)?;
        }
        self.save().await
    }

    pub async fn delete(&mut self) -> Result<Vec<i64>> {
        let id = self.require_id()?;
        let deleted = self
            .service
            .delete_object(self.definition.group(), self.definition.remote_type(), id)
            .await?;
        self.persisted = false;
        Ok(deleted)
    }

    /// Re-fetch the remote state, discarding local values and changes.
    pub async fn reload(&mut self) -> Result<bool> {
        let id = self.require_id()?;
        let found = self
            .service
            .find_object(self.definition.group(), self.definition.remote_type(), id)
            .await?;
        match found {
            Some(attributes) => {
                *self = Self::from_remote(self.definition.clone(), self.service.clone(), attributes);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Asset groups this entity belongs to. Entity records only.
    pub async fn memberships(&self) -> Result<Vec<RemoteType>> {
        self.require_group(Group::Entity, "memberships")?;
        let id = self.require_id()?;
        self.service
            .list_memberships(self.definition.remote_type(), id)
            .await
    }

    /// Add an entity record to this asset group. Asset records only.
    pub async fn add_member(&self, member: &RemoteRecord) -> Result<bool> {
        let (asset_id, entity_id) = self.member_pair(member)?;
        self.service
            .add_group_member(
                self.definition.remote_type(),
                asset_id,
                member.definition.remote_type(),
                entity_id,
            )
            .await
    }

    /// Remove an entity record from this asset group. Asset records only.
    pub async fn remove_member(&self, member: &RemoteRecord) -> Result<bool> {
        let (asset_id, entity_id) = self.member_pair(member)?;
        self.service
            .remove_group_member(
                self.definition.remote_type(),
                asset_id,
                member.definition.remote_type(),
                entity_id,
            )
            .await
    }

    /// Remote-keyed attribute batch for create/update: primary key dropped,
    /// exporters applied, names restored through the reverse snapshot.
    pub fn export_attributes(&self, only_changed: bool) -> Attributes {
        let mut out = Attributes::new();
        for (name, value) in &self.attributes {
            if name == self.definition.primary_key() {
                continue;
            }
            if only_changed && !self.changed.contains_key(name) {
                continue;
            }
            let value = match self.definition.attribute_types().get(name) {
                Some(kind) => kind.export(value),
                None => value.clone(),
            };
            out.insert(name.clone(), value);
        }
        remoteize_batch(&out, &self.remote_keys)
    }

    fn assignable(&self, name: &str) -> bool {
        match self.definition.accessible() {
            Some(allowed) => allowed.iter().any(|a| a == name),
            None => true,
        }
    }

    fn require_id(&self) -> Result<i64> {
        self.id().ok_or_else(|| {
            EloquaError::InvalidArgument(format!(
                "{} record has no id",
                self.definition.name()
            ))
        })
    }

    fn require_group(&self, group: Group, operation: &str) -> Result<()> {
        if self.definition.group() == group {
            Ok(())
        } else {
            Err(EloquaError::InvalidArgument(format!(
                "{} is only available on the {} group",
                operation,
                group.as_str()
            )))
        }
    }

    fn member_pair(&self, member: &RemoteRecord) -> Result<(i64, i64)> {
        self.require_group(Group::Asset, "group membership")?;
        member.require_group(Group::Entity, "group membership")?;
        Ok((self.require_id()?, member.require_id()?))
    }
}

impl std::fmt::Debug for RemoteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRecord")
            .field("definition", &self.definition.name())
            .field("attributes", &self.attributes)
            .field("changed", &self.changed)
            .field("persisted", &self.persisted)
            .finish()
    }
}
