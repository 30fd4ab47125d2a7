//! Client-side data-mapping layer over the Eloqua SOAP marketing API.
//!
//! Eloqua exposes one generic CRUD surface per object group (`entity` for
//! contacts and their kin, `asset` for contact groups). This crate maps that
//! surface onto a typed object model:
//!
//! - [`model::ObjectDefinition`] declares a concrete remote type once:
//!   attribute name mapping, value coercions, validation rules.
//! - [`model::RemoteRecord`] carries live attribute state with dirty
//!   tracking and persists through create/update/delete/reload.
//! - [`Query`] builds paginated, throttled searches over a type.
//! - [`Service`] is the stateless operations layer underneath both,
//!   speaking XML through swappable [`transport::Transport`]s.
//!
//! ```no_run
//! use eloqua_client::{EloquaConfig, Query, Service};
//! use eloqua_client::model::{ObjectDefinition, RemoteRecord};
//! use eloqua_client::naming::Group;
//! use serde_json::json;
//!
//! # async fn run() -> eloqua_client::Result<()> {
//! let service = Service::from_config(EloquaConfig::new("company\\user", "password"));
//! let contact = ObjectDefinition::builder("Contact", Group::Entity)
//!     .map("C_EmailAddress", "email")
//!     .required("email")
//!     .build();
//!
//! let mut record = RemoteRecord::new(
//!     contact.clone(),
//!     service.clone(),
//!     [("email".to_string(), json!("new@example.com"))].into_iter().collect(),
//! );
//! record.save().await?;
//!
//! let mut query = Query::new(service, contact);
//! query.on("email", "=", "*@example.com").limit(50);
//! for record in query.all().await? {
//!     println!("{:?}", record.id());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod naming;
pub mod query;
pub mod response;
pub mod service;
pub mod transport;
pub mod xml;

/// Attribute batch keyed by name. Insertion order is preserved, so request
/// bodies emit fields in the order callers supplied them.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

pub use config::{EloquaConfig, EndpointUrls};
pub use error::{EloquaError, Result};
pub use query::Query;
pub use service::Service;
