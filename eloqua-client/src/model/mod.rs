//! Object model: type descriptors, definitions and record instances.

pub mod definition;
pub mod record;

pub use definition::{AttributeKind, DefinitionBuilder, ObjectDefinition, RemoteType};
pub use record::RemoteRecord;
