//! Stateless service operations layer.
//!
//! Translates group/type/id/attributes into XML bodies and remote method
//! names, dispatches them through the transport and decodes responses into
//! plain attribute maps. Remote business failures surface as typed errors;
//! structural "not found" conditions come back as `None`.

use std::sync::Arc;

use log::debug;
use serde_json::{Value, json};

use crate::Attributes;
use crate::error::{EloquaError, Result};
use crate::model::RemoteType;
use crate::naming::{self, Group};
use crate::response::{dig, ensure_array, value_text, value_to_i64, value_truthy};
use crate::transport::{Endpoint, Transport};
use crate::xml::{TemplateArgs, TemplateRegistry, XmlEmitter};

#[derive(Clone)]
pub struct Service {
    transport: Arc<dyn Transport>,
    templates: Arc<TemplateRegistry>,
}

impl Service {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            templates: Arc::new(TemplateRegistry::default()),
        }
    }

    /// Service backed by the SOAP transport for `config`.
    pub fn from_config(config: crate::config::EloquaConfig) -> Self {
        Self::new(Arc::new(crate::transport::SoapClient::new(config)))
    }

    pub fn with_templates(transport: Arc<dyn Transport>, templates: TemplateRegistry) -> Self {
        Self {
            transport,
            templates: Arc::new(templates),
        }
    }

    pub(crate) fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub(crate) fn builder(&self) -> XmlEmitter {
        XmlEmitter::with_namespace("wsdl")
    }

    pub(crate) async fn request(&self, method: &str, body: Option<String>) -> Result<Value> {
        debug!("service request: {}", method);
        self.transport.invoke(Endpoint::Service, method, body).await
    }

    /// Retrieve a single object by id. Returns the remote-keyed attribute
    /// map plus its numeric `id`, or `None` when the server did not return
    /// a dynamic object.
    pub async fn find_object(
        &self,
        group: Group,
        object_type: &RemoteType,
        id: i64,
    ) -> Result<Option<Attributes>> {
        let body = self.object_type_body(group, object_type, Some(&[id]))?;
        let result = self
            .request(&naming::service_method(group, "retrieve"), Some(body))
            .await?;

        let Some(dynamic) = result.get(group.dynamic_key()) else {
            return Ok(None);
        };
        Ok(dynamic_attributes(group, dynamic))
    }

    /// Create a new object from remote-keyed attributes, returning its id.
    pub async fn create_object(
        &self,
        group: Group,
        object_type: &RemoteType,
        attributes: Attributes,
    ) -> Result<i64> {
        let body = self.dynamic_object_body(group, object_type, None, attributes)?;
        let result = self
            .request(&naming::service_method(group, "create"), Some(body))
            .await?;
        let result = unwrap_key(&result, &naming::result_key(group, "create_result"));

        if let Some(err) = remote_error_in(&result) {
            return Err(err);
        }
        value_to_i64(result.get("id")).ok_or_else(|| EloquaError::Remote {
            code: "Unknown".to_string(),
            message: "create did not return an id".to_string(),
        })
    }

    /// Update an existing object. True when the server confirms the same id.
    pub async fn update_object(
        &self,
        group: Group,
        object_type: &RemoteType,
        id: i64,
        attributes: Attributes,
    ) -> Result<bool> {
        let body = self.dynamic_object_body(group, object_type, Some(id), attributes)?;
        let result = self
            .request(&naming::service_method(group, "update"), Some(body))
            .await?;
        let result = unwrap_key(&result, &naming::result_key(group, "update_result"));

        if let Some(err) = remote_error_in(&result) {
            return Err(err);
        }
        Ok(value_truthy(result.get("success")) && value_to_i64(result.get("id")) == Some(id))
    }

    /// Delete an object by id, returning the deleted ids.
    pub async fn delete_object(
        &self,
        group: Group,
        object_type: &RemoteType,
        id: i64,
    ) -> Result<Vec<i64>> {
        let body = self.object_type_body(group, object_type, Some(&[id]))?;
        let result = self
            .request(&naming::service_method(group, "delete"), Some(body))
            .await?;
        let result = unwrap_key(&result, &naming::result_key(group, "delete_result"));

        if let Some(err) = remote_error_in(&result) {
            return Err(err);
        }
        if value_truthy(result.get("success")) && value_to_i64(result.get("id")) == Some(id) {
            Ok(vec![id])
        } else {
            Err(EloquaError::Remote {
                code: "Unknown".to_string(),
                message: "delete did not confirm the id".to_string(),
            })
        }
    }

    /// Group memberships of an entity, as type descriptors.
    pub async fn list_memberships(
        &self,
        entity_type: &RemoteType,
        entity_id: i64,
    ) -> Result<Vec<RemoteType>> {
        let mut xml = self.builder();
        self.templates.apply(
            &mut xml,
            "object",
            &TemplateArgs::Object {
                group: Group::Entity,
                object_type: entity_type.clone(),
                id: entity_id,
            },
        )?;
        let result = self
            .request("list_group_membership", Some(xml.into_string()))
            .await?;

        Ok(ensure_array(result.get("dynamic_asset"))
            .iter()
            .filter_map(|object| object.get("asset_type"))
            .map(remote_type_from)
            .collect())
    }

    pub async fn add_group_member(
        &self,
        asset_type: &RemoteType,
        asset_id: i64,
        entity_type: &RemoteType,
        entity_id: i64,
    ) -> Result<bool> {
        self.member_operation("add_group_member", asset_type, asset_id, entity_type, entity_id)
            .await
    }

    pub async fn remove_group_member(
        &self,
        asset_type: &RemoteType,
        asset_id: i64,
        entity_type: &RemoteType,
        entity_id: i64,
    ) -> Result<bool> {
        self.member_operation(
            "remove_group_member",
            asset_type,
            asset_id,
            entity_type,
            entity_id,
        )
        .await
    }

    /// Names of the types available in a group.
    pub async fn list_types(&self, group: Group) -> Result<Vec<String>> {
        let method = format!("list_{}_types", group.as_str());
        let result = self.request(&method, None).await?;
        let types_key = format!("{}_types", group.as_str());
        Ok(
            ensure_array(result.get(&types_key).and_then(|types| types.get("string")))
                .iter()
                .map(value_text)
                .collect(),
        )
    }

    /// Field metadata for a type, with the group-specific field-definition
    /// nesting normalized to a flat list under `fields`.
    pub async fn describe(&self, group: Group, object_type: &RemoteType) -> Result<Value> {
        let body = self.object_type_body(group, object_type, None)?;
        let method = format!("describe_{}", group.as_str());
        let mut result = self.request(&method, Some(body)).await?;

        let normalized = result
            .get("fields")
            .and_then(|fields| fields.get(group.field_definition_key()))
            .map(|defs| Value::Array(ensure_array(Some(defs))));
        if let (Some(fields), Some(map)) = (normalized, result.as_object_mut()) {
            map.insert("fields".to_string(), fields);
        }
        Ok(result)
    }

    /// Type descriptors matching a type name, single and multi server
    /// shapes normalized uniformly.
    pub async fn describe_type(&self, group: Group, type_name: &str) -> Result<Vec<RemoteType>> {
        let name_key = match group {
            Group::Entity => "global_entity_type".to_string(),
            _ => format!("{}_type", group.as_str()),
        };
        let mut xml = self.builder();
        xml.text_element(&name_key, type_name);

        let method = format!("describe_{}_type", group.as_str());
        let result = self.request(&method, Some(xml.into_string())).await?;

        let types_key = format!("{}_types", group.as_str());
        let type_key = format!("{}_type", group.as_str());
        Ok(
            ensure_array(dig(&result, &[types_key.as_str(), type_key.as_str()]))
                .iter()
                .map(remote_type_from)
                .collect(),
        )
    }

    async fn member_operation(
        &self,
        operation: &str,
        asset_type: &RemoteType,
        asset_id: i64,
        entity_type: &RemoteType,
        entity_id: i64,
    ) -> Result<bool> {
        let body = self.association_body(asset_type, asset_id, entity_type, entity_id)?;
        let result = self.request(operation, Some(body)).await?;

        if value_truthy(result.get("success")) {
            Ok(true)
        } else if let Some(err) = remote_error_in(&result) {
            Err(err)
        } else {
            Ok(false)
        }
    }

    /// Composite payload naming both sides of an entity/asset association.
    fn association_body(
        &self,
        asset_type: &RemoteType,
        asset_id: i64,
        entity_type: &RemoteType,
        entity_id: i64,
    ) -> Result<String> {
        let mut xml = self.builder();
        self.templates.apply(
            &mut xml,
            "object",
            &TemplateArgs::Object {
                group: Group::Entity,
                object_type: entity_type.clone(),
                id: entity_id,
            },
        )?;
        self.templates.apply(
            &mut xml,
            "object",
            &TemplateArgs::Object {
                group: Group::Asset,
                object_type: asset_type.clone(),
                id: asset_id,
            },
        )?;
        Ok(xml.into_string())
    }

    /// Body with the lowercased object-type tag and optional id list, shared
    /// by retrieve/delete/describe.
    fn object_type_body(
        &self,
        group: Group,
        object_type: &RemoteType,
        ids: Option<&[i64]>,
    ) -> Result<String> {
        let mut xml = self.builder();
        xml.element(group.type_tag_lower(), |xml| {
            self.templates
                .apply(xml, "object_type", &TemplateArgs::ObjectType(object_type.clone()))
        })?;
        if let Some(ids) = ids {
            let values: Vec<Value> = ids.iter().map(|id| json!(id)).collect();
            xml.element("ids", |xml| {
                self.templates
                    .apply(xml, "int_array", &TemplateArgs::IntArray(values.clone()))
            })?;
        }
        Ok(xml.into_string())
    }

    /// Dynamic-object body wrapped in the group's collection tag, shared by
    /// create/update.
    fn dynamic_object_body(
        &self,
        group: Group,
        object_type: &RemoteType,
        id: Option<i64>,
        attributes: Attributes,
    ) -> Result<String> {
        let args = TemplateArgs::Dynamic {
            group,
            object_type: object_type.clone(),
            id,
            attributes,
        };
        let mut xml = self.builder();
        xml.element(group.collection_tag(), |xml| {
            xml.element(group.dynamic_tag(), |xml| {
                self.templates.apply(xml, "dynamic", &args)
            })
        })?;
        Ok(xml.into_string())
    }
}

/// Flatten a dynamic-object response node (`id` plus a field value
/// collection) into a remote-keyed attribute map. `None` when the node has
/// no field collection.
pub(crate) fn dynamic_attributes(group: Group, dynamic: &Value) -> Option<Attributes> {
    let collection = dynamic.get("field_value_collection")?;

    let mut attributes = Attributes::new();
    if let Some(id) = value_to_i64(dynamic.get("id")) {
        attributes.insert("id".to_string(), json!(id));
    }
    for field in ensure_array(collection.get(group.fields_key())) {
        let name = field
            .get("internal_name")
            .map(value_text)
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        attributes.insert(name, field.get("value").cloned().unwrap_or(Value::Null));
    }
    Some(attributes)
}

/// Index into a result by key, `Null` when absent.
fn unwrap_key(result: &Value, key: &str) -> Value {
    result.get(key).cloned().unwrap_or(Value::Null)
}

/// Typed error for an `errors.error` structure, when one is present.
fn remote_error_in(result: &Value) -> Option<EloquaError> {
    let error = dig(result, &["errors", "error"])?;
    let code = error.get("error_code").map(value_text).unwrap_or_default();
    let message = error.get("message").map(value_text).unwrap_or_default();
    Some(EloquaError::remote_failure(code, message))
}

/// Decode an object-type response node (`{id, name, type}`) into a
/// [`RemoteType`].
fn remote_type_from(value: &Value) -> RemoteType {
    RemoteType {
        name: value.get("name").map(value_text).unwrap_or_default(),
        type_name: value.get("type").map(value_text).unwrap_or_default(),
        id: value_to_i64(value.get("id")).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, Service) {
        let mock = Arc::new(MockTransport::new());
        let service = Service::new(mock.clone());
        (mock, service)
    }

    fn contact_type() -> RemoteType {
        RemoteType::new("Contact")
    }

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_object_returns_id() {
        let (mock, service) = setup();
        mock.push(json!({
            "create_asset_result": {"asset_type": {}, "errors": null, "id": 1}
        }));

        let id = service
            .create_object(
                Group::Asset,
                &contact_type(),
                attrs(&[("C_EmailAddress", json!("create"))]),
            )
            .await
            .unwrap();

        assert_eq!(id, 1);
        assert!(mock.calls().iter().all(|c| c.endpoint == Endpoint::Service));
        let call = mock.last_call();
        assert_eq!(call.operation, "create_asset");
        let body = call.body.unwrap();
        assert!(body.starts_with("<wsdl:assets><wsdl:DynamicAsset>"));
        assert!(body.contains("<wsdl:InternalName>C_EmailAddress</wsdl:InternalName>"));
        assert!(!body.contains("<wsdl:Id>"));
    }

    #[tokio::test]
    async fn test_create_object_duplicate_raises() {
        let (mock, service) = setup();
        mock.push(json!({
            "create_result": {
                "errors": {
                    "error": {
                        "error_code": "DuplicateValue",
                        "message": "You are attempting to create a duplicate entity."
                    }
                }
            }
        }));

        let err = service
            .create_object(Group::Entity, &contact_type(), Attributes::new())
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert!(err.to_string().contains("DuplicateValue"));
        assert!(err.to_string().contains("duplicate entity"));
    }

    #[tokio::test]
    async fn test_update_object_requires_matching_id() {
        let (mock, service) = setup();
        mock.push(json!({
            "update_result": {"errors": null, "id": "1", "success": true}
        }));
        let ok = service
            .update_object(
                Group::Entity,
                &contact_type(),
                1,
                attrs(&[("C_EmailAddress", json!("update"))]),
            )
            .await
            .unwrap();
        assert!(ok);

        mock.push(json!({
            "update_result": {"errors": null, "id": "2", "success": true}
        }));
        let ok = service
            .update_object(Group::Entity, &contact_type(), 1, Attributes::new())
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_update_body_carries_id() {
        let (mock, service) = setup();
        mock.push(json!({
            "update_result": {"errors": null, "id": "1", "success": true}
        }));
        service
            .update_object(Group::Entity, &contact_type(), 1, Attributes::new())
            .await
            .unwrap();
        let body = mock.last_call().body.unwrap();
        assert!(body.contains("<wsdl:Id>1</wsdl:Id>"));
        assert!(body.starts_with("<wsdl:entities><wsdl:DynamicEntity>"));
    }

    #[tokio::test]
    async fn test_delete_object_returns_deleted_ids() {
        let (mock, service) = setup();
        mock.push(json!({
            "delete_result": {"errors": null, "id": "1", "success": true}
        }));
        let ids = service
            .delete_object(Group::Entity, &contact_type(), 1)
            .await
            .unwrap();
        assert_eq!(ids, vec![1]);

        let body = mock.last_call().body.unwrap();
        assert!(body.starts_with("<wsdl:entityType>"));
        assert!(body.contains("<arr:int>1</arr:int>"));
        assert_eq!(mock.last_call().operation, "delete");
    }

    #[tokio::test]
    async fn test_find_object_flattens_field_collection() {
        let (mock, service) = setup();
        mock.push(json!({
            "dynamic_entity": {
                "field_value_collection": {
                    "entity_fields": [
                        {"internal_name": "C_EmailAddress", "value": "wow@example.com"},
                        {"internal_name": "C_FirstName", "value": "Wow"}
                    ]
                },
                "id": "5"
            }
        }));

        let found = service
            .find_object(Group::Entity, &contact_type(), 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("id"), Some(&json!(5)));
        assert_eq!(found.get("C_EmailAddress"), Some(&json!("wow@example.com")));
        assert_eq!(found.get("C_FirstName"), Some(&json!("Wow")));
    }

    #[tokio::test]
    async fn test_find_object_without_dynamic_entity_is_none() {
        let (mock, service) = setup();
        mock.push(json!({}));
        let found = service
            .find_object(Group::Entity, &contact_type(), 5)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_object_single_field_collapse() {
        let (mock, service) = setup();
        mock.push(json!({
            "dynamic_entity": {
                "field_value_collection": {
                    "entity_fields": {"internal_name": "C_EmailAddress", "value": "one"}
                },
                "id": "1"
            }
        }));
        let found = service
            .find_object(Group::Entity, &contact_type(), 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("C_EmailAddress"), Some(&json!("one")));
    }

    #[tokio::test]
    async fn test_member_operation_success_and_failure() {
        let (mock, service) = setup();
        let asset = RemoteType::new("ContactGroup");
        let entity = contact_type();

        mock.push(json!({"success": true}));
        assert!(
            service
                .add_group_member(&asset, 1, &entity, 1)
                .await
                .unwrap()
        );
        let body = mock.last_call().body.unwrap();
        assert!(body.contains("<wsdl:entity>"));
        assert!(body.contains("<wsdl:asset>"));

        mock.push(json!({"success": false}));
        assert!(
            !service
                .remove_group_member(&asset, 1, &entity, 1)
                .await
                .unwrap()
        );

        mock.push(json!({
            "errors": {"error": {"error_code": "Fail", "message": "no"}}
        }));
        assert!(
            service
                .add_group_member(&asset, 1, &entity, 1)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_list_memberships_maps_asset_types() {
        let (mock, service) = setup();
        mock.push(json!({
            "dynamic_asset": [
                {"asset_type": {"id": "1", "name": "Group One", "type": "ContactGroup"}},
                {"asset_type": {"id": "2", "name": "Group Two", "type": "ContactGroup"}}
            ]
        }));

        let memberships = service.list_memberships(&contact_type(), 1).await.unwrap();
        assert_eq!(memberships.len(), 2);
        assert_eq!(memberships[0].name, "Group One");
        assert_eq!(memberships[1].id, 2);
        assert_eq!(mock.last_call().operation, "list_group_membership");
    }

    #[tokio::test]
    async fn test_list_types() {
        let (mock, service) = setup();
        mock.push(json!({"entity_types": {"string": ["Base", "Contact"]}}));
        let types = service.list_types(Group::Entity).await.unwrap();
        assert_eq!(types, vec!["Base", "Contact"]);
        assert_eq!(mock.last_call().operation, "list_entity_types");
    }

    #[tokio::test]
    async fn test_describe_normalizes_field_definitions() {
        let (mock, service) = setup();
        mock.push(json!({
            "entity_type": {"id": "1", "name": "Contact", "type": "Base"},
            "fields": {
                "dynamic_entity_field_definition": [
                    {"internal_name": "C_EmailAddress", "data_type": "Text"}
                ]
            }
        }));

        let described = service.describe(Group::Entity, &contact_type()).await.unwrap();
        let fields = described["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0]["internal_name"], json!("C_EmailAddress"));
        assert_eq!(mock.last_call().operation, "describe_entity");
    }

    #[tokio::test]
    async fn test_describe_type_normalizes_single_and_multi() {
        let (mock, service) = setup();
        mock.push(json!({
            "entity_types": {"entity_type": {"id": "1", "name": "Contact", "type": "Base"}}
        }));
        let single = service.describe_type(Group::Entity, "Contact").await.unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name, "Contact");
        let body = mock.last_call().body.unwrap();
        assert!(body.contains("<wsdl:global_entity_type>Contact</wsdl:global_entity_type>"));

        mock.push(json!({
            "asset_types": {"asset_type": [
                {"id": "1", "name": "One", "type": "ContactGroup"},
                {"id": "2", "name": "Two", "type": "ContactGroup"}
            ]}
        }));
        let multi = service.describe_type(Group::Asset, "ContactGroup").await.unwrap();
        assert_eq!(multi.len(), 2);
        assert_eq!(mock.last_call().operation, "describe_asset_type");
    }
}
