//! Paginated, throttled search query builder.
//!
//! Queries are built up with chainable mutators, then executed one page at a
//! time. A query remembers that its current page has been fetched and will
//! not hit the network again until a mutator changes the request; the cached
//! collection is served instead. Consecutive requests are spaced out by the
//! per-query request delay.

use std::sync::Arc;

use log::debug;
use serde_json::{Value, json};
use tokio::time::{Duration, Instant, sleep};

use crate::error::Result;
use crate::model::{ObjectDefinition, RemoteRecord};
use crate::naming::Group;
use crate::response::{ensure_array, value_to_i64};
use crate::service::{Service, dynamic_attributes};
use crate::xml::TemplateArgs;

/// Delay between consecutive query requests unless overridden.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 200;

pub struct Query {
    service: Service,
    definition: Arc<ObjectDefinition>,
    conditions: Vec<String>,
    fields: Option<Vec<String>>,
    page: u32,
    limit: u32,
    request_delay: Option<Duration>,
    collection: Vec<RemoteRecord>,
    total_pages: u32,
    has_requested: bool,
    last_request_at: Option<Instant>,
}

impl Query {
    pub fn new(service: Service, definition: Arc<ObjectDefinition>) -> Self {
        Self {
            service,
            definition,
            conditions: Vec::new(),
            fields: None,
            page: 1,
            limit: DEFAULT_LIMIT,
            request_delay: Some(DEFAULT_REQUEST_DELAY),
            collection: Vec::new(),
            total_pages: 0,
            has_requested: false,
            last_request_at: None,
        }
    }

    /// Add a search condition. `field` is a local attribute name and is
    /// translated to its remote field; the value is single-quoted.
    pub fn on(&mut self, field: &str, operator: &str, value: impl std::fmt::Display) -> &mut Self {
        let remote = self.definition.attribute_map().remote_name(field);
        self.conditions
            .push(format!("{}{}'{}'", remote, operator, value));
        self.clear_request();
        self
    }

    /// Drop all conditions.
    pub fn clear_conditions(&mut self) -> &mut Self {
        self.conditions.clear();
        self.clear_request();
        self
    }

    /// Restrict the returned fields. Local names; translated on dispatch.
    pub fn fields(&mut self, fields: &[&str]) -> &mut Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self.clear_request();
        self
    }

    pub fn page(&mut self, page: u32) -> &mut Self {
        self.page = page.max(1);
        self.clear_request();
        self
    }

    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.limit = limit;
        self.clear_request();
        self
    }

    /// Override or disable (`None`) the inter-request delay.
    pub fn request_delay(&mut self, delay: Option<Duration>) -> &mut Self {
        self.request_delay = delay;
        self
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    /// Total pages reported by the last request; zero before any request.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_requested(&self) -> bool {
        self.has_requested
    }

    /// Records fetched by the last request.
    pub fn collection(&self) -> &[RemoteRecord] {
        &self.collection
    }

    /// The conditions joined into the wire search string.
    pub fn condition_string(&self) -> String {
        self.conditions.join(" AND ")
    }

    /// Execute the query for the current page. Idempotent until a mutator
    /// resets the request state. Returns whether any pages matched.
    pub async fn request(&mut self) -> Result<bool> {
        if self.has_requested {
            return Ok(self.total_pages > 0);
        }

        self.wait_for_request_delay().await;

        let body = self.build_body()?;
        debug!(
            "querying {} page {} (limit {})",
            self.definition.name(),
            self.page,
            self.limit
        );
        // Search always goes through the entity surface; the response comes
        // back entity-shaped even for asset object types.
        let result = self.service.request("query", Some(body)).await?;
        self.last_request_at = Some(Instant::now());

        let entities = Group::Entity;
        match result
            .get(entities.collection_tag())
            .filter(|v| !v.is_null())
        {
            Some(objects) => {
                self.total_pages = value_to_i64(result.get("total_pages")).unwrap_or(0) as u32;
                self.collection = ensure_array(objects.get(entities.dynamic_key()))
                    .iter()
                    .filter_map(|dynamic| dynamic_attributes(entities, dynamic))
                    .map(|attributes| {
                        RemoteRecord::from_remote(
                            self.definition.clone(),
                            self.service.clone(),
                            attributes,
                        )
                    })
                    .collect();
            }
            None => {
                self.total_pages = 0;
                self.collection.clear();
            }
        }

        self.has_requested = true;
        Ok(self.total_pages > 0)
    }

    /// Fetch the current page and return its records.
    pub async fn all(&mut self) -> Result<&[RemoteRecord]> {
        self.request().await?;
        Ok(&self.collection)
    }

    /// Fetch the current page and visit each record.
    pub async fn each<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&RemoteRecord),
    {
        self.request().await?;
        for record in &self.collection {
            f(record);
        }
        Ok(())
    }

    /// Walk pages, visiting every record, at most `max_pages` pages per call
    /// (all remaining pages when `None`). The cursor rests on the last page
    /// visited, so calling again resumes from the next one.
    pub async fn each_page<F>(&mut self, max_pages: Option<u32>, mut f: F) -> Result<()>
    where
        F: FnMut(&RemoteRecord),
    {
        if max_pages == Some(0) {
            return Ok(());
        }
        if self.has_requested {
            // the current page was consumed by an earlier call
            self.page += 1;
            self.has_requested = false;
        }

        let mut visited = 0u32;
        loop {
            if !self.request().await? {
                break;
            }
            for record in &self.collection {
                f(record);
            }
            visited += 1;
            if self.page >= self.total_pages {
                break;
            }
            if let Some(max) = max_pages {
                if visited >= max {
                    break;
                }
            }
            self.page += 1;
            self.has_requested = false;
        }
        Ok(())
    }

    fn clear_request(&mut self) {
        self.has_requested = false;
    }

    async fn wait_for_request_delay(&self) {
        if let (Some(delay), Some(last)) = (self.request_delay, self.last_request_at) {
            let elapsed = last.elapsed();
            if elapsed < delay {
                sleep(delay - elapsed).await;
            }
        }
    }

    fn build_body(&self) -> Result<String> {
        let templates = self.service.templates();
        let mut xml = self.service.builder();

        xml.element("eloquaType", |xml| {
            templates.apply(
                xml,
                "object_type",
                &TemplateArgs::ObjectType(self.definition.remote_type().clone()),
            )
        })?;
        xml.text_element("searchQuery", &self.condition_string());
        if let Some(fields) = &self.fields {
            let remote: Vec<Value> = fields
                .iter()
                .map(|field| json!(self.definition.attribute_map().remote_name(field)))
                .collect();
            xml.element("fieldNames", |xml| {
                templates.apply(xml, "array", &TemplateArgs::Array(remote.clone()))
            })?;
        }
        xml.text_element("pageNumber", &self.page.to_string());
        xml.text_element("pageSize", &self.limit.to_string());
        Ok(xml.into_string())
    }
}
