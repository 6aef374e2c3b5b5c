//! Category aggregate.
//!
//! Categories form a tree via `parent_id`. The aggregate stores its depth as
//! a denormalized `level` so listings can indent without walking the chain.
//! Cycle detection across the whole tree is the caller's job; the aggregate
//! only rejects the trivial self-parent case.

use chrono::{DateTime, Utc};
use common::{CategoryId, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;

use super::{CatalogError, CategoryEvent, Slug};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    #[serde(default)]
    version: Version,
    name: String,
    slug: Slug,
    parent_id: Option<CategoryId>,
    level: u32,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending: Vec<CategoryEvent>,
}

impl Category {
    /// Creates a category, as a root when `parent` is `None`.
    pub fn create(
        name: impl Into<String>,
        slug: Slug,
        parent: Option<&Category>,
    ) -> Result<Self, CatalogError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::InvalidName(name));
        }

        let parent_id = parent.map(Category::id);
        let level = parent.map_or(0, |p| p.level + 1);
        let now = Utc::now();
        let mut category = Category {
            id: CategoryId::new(),
            version: Version::initial(),
            name: name.clone(),
            slug: slug.clone(),
            parent_id,
            level,
            active: true,
            created_at: now,
            updated_at: now,
            pending: Vec::new(),
        };

        category.record(CategoryEvent::CategoryCreated {
            category_id: category.id,
            name,
            slug: slug.as_str().to_string(),
            parent_id,
            level,
        });
        Ok(category)
    }

    /// Renames the category and updates its slug.
    pub fn rename(&mut self, name: impl Into<String>, slug: Slug) -> Result<(), CatalogError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::InvalidName(name));
        }
        if name == self.name && slug == self.slug {
            return Ok(());
        }

        self.name = name.clone();
        self.slug = slug.clone();
        self.record(CategoryEvent::CategoryRenamed {
            name,
            slug: slug.as_str().to_string(),
        });
        self.touch();
        Ok(())
    }

    /// Moves the category under a new parent, or to the root with `None`.
    ///
    /// Children are not reparented here; the handler re-levels descendants
    /// after a move.
    pub fn move_under(&mut self, parent: Option<&Category>) -> Result<(), CatalogError> {
        let parent_id = parent.map(Category::id);
        if parent_id == Some(self.id) {
            return Err(CatalogError::SelfParent);
        }
        if parent_id == self.parent_id {
            return Ok(());
        }

        self.parent_id = parent_id;
        self.level = parent.map_or(0, |p| p.level + 1);
        self.record(CategoryEvent::CategoryMoved {
            parent_id,
            level: self.level,
        });
        self.touch();
        Ok(())
    }

    /// Shows or hides the category. No-op when already in that state.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }

        self.active = active;
        let event = if active {
            CategoryEvent::CategoryActivated
        } else {
            CategoryEvent::CategoryDeactivated
        };
        self.record(event);
        self.touch();
    }

    /// Recomputes the level from a freshly loaded parent. Used when an
    /// ancestor moved and this category's depth went stale.
    pub fn relevel(&mut self, parent: Option<&Category>) {
        let level = parent.map_or(0, |p| p.level + 1);
        if level == self.level {
            return;
        }
        self.level = level;
        self.record(CategoryEvent::CategoryMoved {
            parent_id: self.parent_id,
            level,
        });
        self.touch();
    }

    pub fn id(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn parent_id(&self) -> Option<CategoryId> {
        self.parent_id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn record(&mut self, event: CategoryEvent) {
        self.pending.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl AggregateRoot for Category {
    type Event = CategoryEvent;

    fn aggregate_type() -> &'static str {
        "category"
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

    fn pending_events(&self) -> &[CategoryEvent] {
        &self.pending
    }

    fn take_events(&mut self) -> Vec<CategoryEvent> {
        std::mem::take(&mut self.pending)
    }
}
