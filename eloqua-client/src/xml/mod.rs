//! XML request-body assembly: emitter plus the named template engine.

pub mod emitter;
pub mod templates;

pub use emitter::XmlEmitter;
pub use templates::{TemplateArgs, TemplateFn, TemplateRegistry};
