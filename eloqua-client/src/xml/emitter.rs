//! XML emission with an optional default namespace prefix.
//!
//! Request bodies are assembled against an emitter configured with the
//! `wsdl` default namespace; any tag written without an explicit namespace
//! gets that prefix automatically, while array elements override it with
//! the `arr` namespace.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;

pub struct XmlEmitter {
    writer: Writer<Vec<u8>>,
    default_ns: Option<String>,
}

impl XmlEmitter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            default_ns: None,
        }
    }

    pub fn with_namespace(ns: impl Into<String>) -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            default_ns: Some(ns.into()),
        }
    }

    fn qualified(&self, name: &str) -> String {
        match &self.default_ns {
            Some(ns) if !name.contains(':') => format!("{}:{}", ns, name),
            _ => name.to_string(),
        }
    }

    fn write(&mut self, event: Event) {
        // Writing into a Vec<u8> sink cannot fail.
        self.writer
            .write_event(event)
            .expect("write into in-memory buffer");
    }

    /// Container element under the default namespace.
    pub fn element<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let tag = self.qualified(name);
        self.write(Event::Start(BytesStart::new(tag.as_str())));
        f(self)?;
        self.write(Event::End(BytesEnd::new(tag.as_str())));
        Ok(())
    }

    /// Container element with an explicit namespace override.
    pub fn element_ns<F>(&mut self, ns: &str, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let tag = format!("{}:{}", ns, name);
        self.write(Event::Start(BytesStart::new(tag.as_str())));
        f(self)?;
        self.write(Event::End(BytesEnd::new(tag.as_str())));
        Ok(())
    }

    /// Leaf element with text content, under the default namespace.
    pub fn text_element(&mut self, name: &str, text: &str) {
        let tag = self.qualified(name);
        self.write(Event::Start(BytesStart::new(tag.as_str())));
        self.write(Event::Text(BytesText::new(text)));
        self.write(Event::End(BytesEnd::new(tag.as_str())));
    }

    /// Leaf element with text content and an explicit namespace override.
    pub fn text_element_ns(&mut self, ns: &str, name: &str, text: &str) {
        let tag = format!("{}:{}", ns, name);
        self.write(Event::Start(BytesStart::new(tag.as_str())));
        self.write(Event::Text(BytesText::new(text)));
        self.write(Event::End(BytesEnd::new(tag.as_str())));
    }

    pub fn into_string(self) -> String {
        String::from_utf8(self.writer.into_inner()).expect("emitter output is valid utf8")
    }
}

impl Default for XmlEmitter {
    fn default() -> Self {
        Self::new()
    }
}
