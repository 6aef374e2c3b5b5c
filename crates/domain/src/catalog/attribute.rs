//! Attribute definitions.
//!
//! Attributes describe the named characteristics a product variant can carry
//! (color, size, material). Each definition fixes a value kind and a set of
//! flags controlling how storefront queries may use it.

use chrono::{DateTime, Utc};
use common::{AttributeId, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;

use super::{AttributeEvent, CatalogError};

/// Value kind an attribute accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Free-form text.
    Text,
    /// Numeric value.
    Number,
    /// True or false.
    Boolean,
    /// One of a fixed set of options.
    Select { options: Vec<String> },
}

impl AttributeKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::Text => "text",
            AttributeKind::Number => "number",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Select { .. } => "select",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    id: AttributeId,
    #[serde(default)]
    version: Version,
    name: String,
    display_name: String,
    kind: AttributeKind,
    filterable: bool,
    searchable: bool,
    variant_defining: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending: Vec<AttributeEvent>,
}

impl Attribute {
    /// Creates an attribute definition.
    ///
    /// `name` is the machine identifier and must be snake_case; it is
    /// immutable after creation. `Select` kinds need at least one option.
    pub fn create(
        name: impl Into<String>,
        display_name: impl Into<String>,
        kind: AttributeKind,
    ) -> Result<Self, CatalogError> {
        let name = name.into();
        if !is_snake_case(&name) {
            return Err(CatalogError::InvalidAttributeName(name));
        }
        if let AttributeKind::Select { options } = &kind {
            if options.is_empty() {
                return Err(CatalogError::NoSelectOptions);
            }
        }
        let display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            return Err(CatalogError::InvalidName(display_name));
        }

        let now = Utc::now();
        let mut attribute = Attribute {
            id: AttributeId::new(),
            version: Version::initial(),
            name: name.clone(),
            display_name,
            kind,
            filterable: false,
            searchable: false,
            variant_defining: false,
            created_at: now,
            updated_at: now,
            pending: Vec::new(),
        };

        attribute.record(AttributeEvent::AttributeCreated {
            attribute_id: attribute.id,
            name,
        });
        Ok(attribute)
    }

    /// Changes the human-facing label.
    pub fn rename(&mut self, display_name: impl Into<String>) -> Result<(), CatalogError> {
        let display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            return Err(CatalogError::InvalidName(display_name));
        }
        if display_name == self.display_name {
            return Ok(());
        }

        self.display_name = display_name;
        self.record_updated();
        self.touch();
        Ok(())
    }

    /// Sets the query flags. No-op when nothing changes.
    pub fn set_flags(&mut self, filterable: bool, searchable: bool, variant_defining: bool) {
        if self.filterable == filterable
            && self.searchable == searchable
            && self.variant_defining == variant_defining
        {
            return;
        }

        self.filterable = filterable;
        self.searchable = searchable;
        self.variant_defining = variant_defining;
        self.record_updated();
        self.touch();
    }

    pub fn id(&self) -> AttributeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn is_variant_defining(&self) -> bool {
        self.variant_defining
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn record_updated(&mut self) {
        self.record(AttributeEvent::AttributeUpdated {
            display_name: self.display_name.clone(),
            filterable: self.filterable,
            searchable: self.searchable,
            variant_defining: self.variant_defining,
        });
    }

    fn record(&mut self, event: AttributeEvent) {
        self.pending.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn is_snake_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl AggregateRoot for Attribute {
    type Event = AttributeEvent;

    fn aggregate_type() -> &'static str {
        "attribute"
    }

    fn aggregate_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn pending_events(&self) -> &[AttributeEvent] {
        &self.pending
    }

    fn take_events(&mut self) -> Vec<AttributeEvent> {
        std::mem::take(&mut self.pending)
    }
}
