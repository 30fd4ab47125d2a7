//! SOAP transport over HTTP.
//!
//! Builds the envelope (WSSE username-token header, `arr` array namespace),
//! posts it with reqwest and decodes the response XML into a nested
//! `serde_json::Value` with snake_cased keys. Repeated sibling elements
//! collapse into arrays, mirroring how the rest of the crate consumes
//! results.

use async_trait::async_trait;
use log::{debug, warn};
use quick_xml::escape::escape;
use serde_json::{Map, Value};

use crate::config::EloquaConfig;
use crate::error::{EloquaError, Result};
use crate::naming::{to_pascal_case, to_snake_case};
use crate::transport::{Endpoint, Transport};

/// Namespace for Eloqua array payload elements.
pub const XML_NS_ARRAY: &str = "http://schemas.microsoft.com/2003/10/Serialization/Arrays";

/// Service namespace shared by all three endpoint families.
pub const XML_NS_SERVICE: &str = "https://secure.eloqua.com/API/1.2";

const XML_NS_SOAP: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const XML_NS_WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

pub struct SoapClient {
    config: EloquaConfig,
    http: reqwest::Client,
}

impl SoapClient {
    pub fn new(config: EloquaConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Service => &self.config.endpoints.service,
            Endpoint::Data => &self.config.endpoints.data,
            Endpoint::Email => &self.config.endpoints.email,
        }
    }

    fn build_envelope(&self, operation_tag: &str, body: Option<&str>) -> String {
        format!(
            concat!(
                r#"<soapenv:Envelope xmlns:soapenv="{soap}" xmlns:wsdl="{wsdl}" xmlns:arr="{arr}">"#,
                r#"<soapenv:Header>"#,
                r#"<wsse:Security xmlns:wsse="{wsse}" soapenv:mustUnderstand="1">"#,
                r#"<wsse:UsernameToken>"#,
                r#"<wsse:Username>{user}</wsse:Username>"#,
                r#"<wsse:Password>{password}</wsse:Password>"#,
                r#"</wsse:UsernameToken>"#,
                r#"</wsse:Security>"#,
                r#"</soapenv:Header>"#,
                r#"<soapenv:Body><wsdl:{op}>{body}</wsdl:{op}></soapenv:Body>"#,
                r#"</soapenv:Envelope>"#
            ),
            soap = XML_NS_SOAP,
            wsdl = XML_NS_SERVICE,
            arr = XML_NS_ARRAY,
            wsse = XML_NS_WSSE,
            user = escape(self.config.username.as_str()),
            password = escape(self.config.password.as_str()),
            op = operation_tag,
            body = body.unwrap_or(""),
        )
    }
}

#[async_trait]
impl Transport for SoapClient {
    async fn invoke(
        &self,
        endpoint: Endpoint,
        operation: &str,
        body: Option<String>,
    ) -> Result<Value> {
        self.config.validate()?;

        let operation_tag = to_pascal_case(operation);
        let envelope = self.build_envelope(&operation_tag, body.as_deref());
        let url = self.endpoint_url(endpoint);

        debug!("invoking {} against {}", operation, url);
        let response = self
            .http
            .post(url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("{}/{}", XML_NS_SERVICE, operation_tag))
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!("{} returned HTTP {}", operation, status);
            if let Some(fault) = extract_fault(&text) {
                return Err(EloquaError::Fault(fault));
            }
            return Err(EloquaError::Fault(format!("HTTP {}", status)));
        }

        parse_response(operation, &text)
    }
}

/// Pull the fault string out of a response body, if the body is parseable
/// XML containing a fault element.
fn extract_fault(text: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(text).ok()?;
    let fault = doc
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "Fault")?;
    let reason = fault
        .descendants()
        .find(|node| {
            node.is_element()
                && matches!(node.tag_name().name(), "faultstring" | "Text" | "Reason")
        })
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown SOAP fault");
    Some(reason.to_string())
}

/// Decode a successful response body and unwrap the
/// `{operation}_response.{operation}_result` envelope.
pub(crate) fn parse_response(operation: &str, text: &str) -> Result<Value> {
    if let Some(fault) = extract_fault(text) {
        return Err(EloquaError::Fault(fault));
    }

    let doc = roxmltree::Document::parse(text)?;
    let body = doc
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "Body")
        .ok_or_else(|| EloquaError::Fault("response has no SOAP body".to_string()))?;

    let payload = body
        .children()
        .find(|node| node.is_element())
        .map(element_to_value)
        .unwrap_or(Value::Null);

    let mut result = payload;
    for key in [
        format!("{}_response", operation),
        format!("{}_result", operation),
    ] {
        if let Some(inner) = result.get(&key) {
            result = inner.clone();
        }
    }
    Ok(result)
}

/// Convert an element tree into a value: leaves become strings (empty ones
/// `Null`), containers become maps, repeated sibling tags become arrays.
fn element_to_value(node: roxmltree::Node) -> Value {
    let children: Vec<_> = node.children().filter(|c| c.is_element()).collect();
    if children.is_empty() {
        return match node.text().map(str::trim) {
            Some(text) if !text.is_empty() => Value::String(text.to_string()),
            _ => Value::Null,
        };
    }

    let mut map = Map::new();
    for child in children {
        let key = to_snake_case(child.tag_name().name());
        let value = element_to_value(child);
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    Value::Object(map)
}
