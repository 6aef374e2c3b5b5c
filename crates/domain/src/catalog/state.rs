//! Product lifecycle state machine.

use serde::{Deserialize, Serialize};

/// The state of a product in its lifecycle.
///
/// State transitions:
/// ```text
/// Draft ──► Active ◄──► Inactive
///   │          │            │
///   └──────────┴────────────┴──► Archived
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductStatus {
    /// Product is being prepared and is not sellable yet.
    #[default]
    Draft,

    /// Product is published and sellable.
    Active,

    /// Product is temporarily hidden from sale.
    Inactive,

    /// Product is retired (terminal state).
    Archived,
}

impl ProductStatus {
    /// Returns true if a transition to `target` is allowed.
    pub fn can_transition_to(&self, target: ProductStatus) -> bool {
        use ProductStatus::*;
        matches!(
            (self, target),
            (Draft, Active)
                | (Active, Inactive)
                | (Inactive, Active)
                | (Draft, Archived)
                | (Active, Archived)
                | (Inactive, Archived)
        )
    }

    /// Returns true if the product can be sold in this state.
    pub fn is_sellable(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }

    /// Returns true if this is a terminal state.
    pub fn is_archived(&self) -> bool {
        matches!(self, ProductStatus::Archived)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
