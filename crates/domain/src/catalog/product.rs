//! Product aggregate.
//!
//! A product owns its variants and their stock levels. All stock movement
//! goes through the aggregate so the `reserved <= on_hand` invariant and the
//! product lifecycle guards live in one place.

use chrono::{DateTime, Utc};
use common::{CategoryId, Metadata, Money, ProductId, VariantId, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;

use super::{
    CatalogError, ProductEvent, ProductStatus, Sku, Slug, StockLevel, VariantAttribute,
};

/// A sellable variation of a product.
///
/// Carries its own SKU, optional price override and stock level. Variants are
/// only reachable through the owning [`Product`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    id: VariantId,
    sku: Sku,
    price: Option<Money>,
    attributes: Vec<VariantAttribute>,
    stock: StockLevel,
    active: bool,
    metadata: Metadata,
}

impl Variant {
    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Price override. `None` means the product's base price applies.
    pub fn price(&self) -> Option<Money> {
        self.price
    }

    pub fn attributes(&self) -> &[VariantAttribute] {
        &self.attributes
    }

    pub fn stock(&self) -> &StockLevel {
        &self.stock
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Product aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    #[serde(default)]
    version: Version,
    name: String,
    slug: Slug,
    description: String,
    base_price: Money,
    status: ProductStatus,
    category_ids: Vec<CategoryId>,
    variants: Vec<Variant>,
    metadata: Metadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending: Vec<ProductEvent>,
}

impl Product {
    /// Creates a new product in `Draft` status.
    ///
    /// When `initial_sku` is given a default variant is created alongside the
    /// product so it can carry stock before any explicit variants exist.
    pub fn create(
        name: impl Into<String>,
        slug: Slug,
        description: impl Into<String>,
        base_price: Money,
        initial_sku: Option<Sku>,
        metadata: Metadata,
    ) -> Result<Self, CatalogError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::InvalidName(name));
        }
        if !base_price.is_positive() {
            return Err(CatalogError::InvalidPrice {
                cents: base_price.cents(),
            });
        }

        let now = Utc::now();
        let mut product = Product {
            id: ProductId::new(),
            version: Version::initial(),
            name: name.clone(),
            slug: slug.clone(),
            description: description.into().trim().to_string(),
            base_price,
            status: ProductStatus::Draft,
            category_ids: Vec::new(),
            variants: Vec::new(),
            metadata,
            created_at: now,
            updated_at: now,
            pending: Vec::new(),
        };

        product.record(ProductEvent::ProductCreated {
            product_id: product.id,
            name,
            slug: slug.as_str().to_string(),
            base_price,
            created_at: now,
        });

        if let Some(sku) = initial_sku {
            product.add_variant(sku, None, Vec::new(), 0, Metadata::new())?;
        }

        Ok(product)
    }

    /// Updates name and description.
    pub fn update_details(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), CatalogError> {
        self.ensure_not_archived()?;

        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::InvalidName(name));
        }
        let description = description.into().trim().to_string();

        if name == self.name && description == self.description {
            return Ok(());
        }

        self.name = name.clone();
        self.description = description.clone();
        self.record(ProductEvent::ProductDetailsUpdated { name, description });
        self.touch();
        Ok(())
    }

    /// Changes the base price. No-op when the price is unchanged.
    pub fn change_price(&mut self, new_price: Money) -> Result<(), CatalogError> {
        self.ensure_not_archived()?;

        if !new_price.is_positive() {
            return Err(CatalogError::InvalidPrice {
                cents: new_price.cents(),
            });
        }
        if new_price.currency() != self.base_price.currency() {
            return Err(CatalogError::CurrencyMismatch {
                expected: self.base_price.currency(),
                actual: new_price.currency(),
            });
        }
        if new_price == self.base_price {
            return Ok(());
        }

        let old_price = self.base_price;
        self.base_price = new_price;
        self.record(ProductEvent::ProductPriceChanged {
            old_price,
            new_price,
        });
        self.touch();
        Ok(())
    }

    /// Moves the product through its lifecycle.
    ///
    /// Valid transitions are `Draft -> Active`, `Active <-> Inactive`, and any
    /// non-archived status to `Archived`. Archived is terminal.
    pub fn set_status(&mut self, new_status: ProductStatus) -> Result<(), CatalogError> {
        if new_status == self.status {
            return Ok(());
        }
        if !self.status.can_transition_to(new_status) {
            return Err(CatalogError::InvalidStatusTransition {
                from: self.status,
                to: new_status,
            });
        }

        let old_status = self.status;
        self.status = new_status;
        self.record(ProductEvent::ProductStatusChanged {
            old_status,
            new_status,
        });
        self.touch();
        Ok(())
    }

    /// Assigns the product to a category. Idempotent.
    pub fn assign_category(&mut self, category_id: CategoryId) -> Result<(), CatalogError> {
        self.ensure_not_archived()?;

        if self.category_ids.contains(&category_id) {
            return Ok(());
        }

        self.category_ids.push(category_id);
        self.record(ProductEvent::ProductCategoryAssigned { category_id });
        self.touch();
        Ok(())
    }

    /// Removes a category assignment.
    pub fn remove_category(&mut self, category_id: CategoryId) -> Result<(), CatalogError> {
        self.ensure_not_archived()?;

        let before = self.category_ids.len();
        self.category_ids.retain(|id| *id != category_id);
        if self.category_ids.len() == before {
            return Err(CatalogError::CategoryNotAssigned { category_id });
        }

        self.record(ProductEvent::ProductCategoryRemoved { category_id });
        self.touch();
        Ok(())
    }

    /// Adds a variant with a unique SKU.
    pub fn add_variant(
        &mut self,
        sku: Sku,
        price: Option<Money>,
        attributes: Vec<VariantAttribute>,
        initial_stock: u32,
        metadata: Metadata,
    ) -> Result<VariantId, CatalogError> {
        self.ensure_not_archived()?;

        if self.variants.iter().any(|v| v.sku == sku) {
            return Err(CatalogError::DuplicateSku {
                sku: sku.as_str().to_string(),
            });
        }
        self.validate_override_price(price)?;

        let variant_id = VariantId::new();
        let event = ProductEvent::VariantAdded {
            variant_id,
            sku: sku.as_str().to_string(),
            price,
            initial_stock,
        };
        self.variants.push(Variant {
            id: variant_id,
            sku,
            price,
            attributes,
            stock: StockLevel::new(initial_stock),
            active: true,
            metadata,
        });
        self.record(event);
        self.touch();
        Ok(variant_id)
    }

    /// Changes a variant's price override. `None` reverts to the base price.
    pub fn update_variant_price(
        &mut self,
        variant_id: VariantId,
        price: Option<Money>,
    ) -> Result<(), CatalogError> {
        self.ensure_not_archived()?;
        self.validate_override_price(price)?;

        let variant = self.variant_mut(variant_id)?;
        if variant.price == price {
            return Ok(());
        }

        let old_price = variant.price;
        variant.price = price;
        self.record(ProductEvent::VariantPriceChanged {
            variant_id,
            old_price,
            new_price: price,
        });
        self.touch();
        Ok(())
    }

    /// Activates or deactivates a variant. No-op when already in that state.
    pub fn set_variant_active(
        &mut self,
        variant_id: VariantId,
        active: bool,
    ) -> Result<(), CatalogError> {
        let variant = self.variant_mut(variant_id)?;
        if variant.active == active {
            return Ok(());
        }

        variant.active = active;
        let sku = variant.sku.as_str().to_string();
        let event = if active {
            ProductEvent::VariantActivated { variant_id, sku }
        } else {
            ProductEvent::VariantDeactivated { variant_id, sku }
        };
        self.record(event);
        self.touch();
        Ok(())
    }

    /// Adjusts on-hand stock by a signed delta.
    ///
    /// The resulting level may not drop below the currently reserved
    /// quantity. Returns the new on-hand count.
    pub fn adjust_stock(
        &mut self,
        variant_id: VariantId,
        delta: i64,
    ) -> Result<u32, CatalogError> {
        self.ensure_not_archived()?;

        let variant = self.variant_mut(variant_id)?;
        let reserved = variant.stock.reserved();
        let would_be = i64::from(variant.stock.on_hand()) + delta;
        if would_be < i64::from(reserved) {
            return Err(CatalogError::StockBelowReserved { would_be, reserved });
        }
        if would_be > i64::from(u32::MAX) {
            return Err(CatalogError::StockOutOfRange { value: would_be });
        }

        let on_hand = would_be as u32;
        variant.stock.set_on_hand(on_hand);
        let sku = variant.sku.as_str().to_string();
        let available = variant.stock.available();
        self.record(ProductEvent::StockAdjusted {
            variant_id,
            sku,
            delta,
            on_hand,
            available,
        });
        self.touch();
        Ok(on_hand)
    }

    /// Reserves stock for a pending order.
    ///
    /// Only allowed while the product is `Active` and the variant is active.
    pub fn reserve_stock(
        &mut self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CatalogError> {
        if !self.status.is_sellable() {
            return Err(CatalogError::ProductNotActive);
        }

        let variant = self.variant_mut(variant_id)?;
        if !variant.active {
            return Err(CatalogError::VariantInactive {
                sku: variant.sku.as_str().to_string(),
            });
        }
        if !variant.stock.can_reserve(quantity) {
            return Err(CatalogError::InsufficientStock {
                sku: variant.sku.as_str().to_string(),
                requested: quantity,
                available: variant.stock.available(),
            });
        }

        variant.stock.reserve(quantity);
        let sku = variant.sku.as_str().to_string();
        let available = variant.stock.available();
        self.record(ProductEvent::StockReserved {
            variant_id,
            sku,
            quantity,
            available,
        });
        self.touch();
        Ok(())
    }

    /// Releases a reservation back to available stock.
    ///
    /// No status guard: cancelled orders must always be able to release, even
    /// after the product was deactivated.
    pub fn release_stock(
        &mut self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CatalogError> {
        let variant = self.variant_mut(variant_id)?;
        if quantity > variant.stock.reserved() {
            return Err(CatalogError::InsufficientReservation {
                sku: variant.sku.as_str().to_string(),
                requested: quantity,
                reserved: variant.stock.reserved(),
            });
        }

        variant.stock.release(quantity);
        let sku = variant.sku.as_str().to_string();
        let available = variant.stock.available();
        self.record(ProductEvent::StockReleased {
            variant_id,
            sku,
            quantity,
            available,
        });
        self.touch();
        Ok(())
    }

    /// Commits a reservation when the order ships. Decrements both reserved
    /// and on-hand counts.
    pub fn commit_stock(
        &mut self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CatalogError> {
        let variant = self.variant_mut(variant_id)?;
        if quantity > variant.stock.reserved() {
            return Err(CatalogError::InsufficientReservation {
                sku: variant.sku.as_str().to_string(),
                requested: quantity,
                reserved: variant.stock.reserved(),
            });
        }

        variant.stock.commit(quantity);
        let sku = variant.sku.as_str().to_string();
        let on_hand = variant.stock.on_hand();
        let available = variant.stock.available();
        self.record(ProductEvent::StockCommitted {
            variant_id,
            sku,
            quantity,
            on_hand,
            available,
        });
        self.touch();
        Ok(())
    }

    /// Sets a metadata entry. Recorded in state only, no event.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key, value);
        self.touch();
    }

    /// Price a buyer pays for the given variant, falling back to the base
    /// price when the variant has no override.
    pub fn effective_price(&self, variant_id: Option<VariantId>) -> Result<Money, CatalogError> {
        match variant_id {
            Some(id) => {
                let variant = self
                    .variant(id)
                    .ok_or(CatalogError::VariantNotFound { variant_id: id })?;
                Ok(variant.price.unwrap_or(self.base_price))
            }
            None => Ok(self.base_price),
        }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn base_price(&self) -> Money {
        self.base_price
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn category_ids(&self) -> &[CategoryId] {
        &self.category_ids
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, variant_id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn variant_mut(&mut self, variant_id: VariantId) -> Result<&mut Variant, CatalogError> {
        self.variants
            .iter_mut()
            .find(|v| v.id == variant_id)
            .ok_or(CatalogError::VariantNotFound { variant_id })
    }

    fn ensure_not_archived(&self) -> Result<(), CatalogError> {
        if self.status.is_archived() {
            return Err(CatalogError::ProductArchived);
        }
        Ok(())
    }

    fn validate_override_price(&self, price: Option<Money>) -> Result<(), CatalogError> {
        if let Some(price) = price {
            if !price.is_positive() {
                return Err(CatalogError::InvalidPrice {
                    cents: price.cents(),
                });
            }
            if price.currency() != self.base_price.currency() {
                return Err(CatalogError::CurrencyMismatch {
                    expected: self.base_price.currency(),
                    actual: price.currency(),
                });
            }
        }
        Ok(())
    }

    fn record(&mut self, event: ProductEvent) {
        self.pending.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl AggregateRoot for Product {
    type Event = ProductEvent;

    fn aggregate_type() -> &'static str {
        "product"
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

    fn pending_events(&self) -> &[ProductEvent] {
        &self.pending
    }

    fn take_events(&mut self) -> Vec<ProductEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Currency;

    fn usd(cents: i64) -> Money {
        Money::from_cents(cents, Currency::Usd)
    }

    fn draft_product() -> Product {
        Product::create(
            "Widget",
            Slug::parse("widget").unwrap(),
            "A fine widget",
            usd(1999),
            Some(Sku::parse("WID-001").unwrap()),
            Metadata::new(),
        )
        .unwrap()
    }

    fn active_product() -> Product {
        let mut product = draft_product();
        product.set_status(ProductStatus::Active).unwrap();
        product.take_events();
        product
    }

    #[test]
    fn test_create_product_with_default_variant() {
        let product = draft_product();

        assert_eq!(product.status(), ProductStatus::Draft);
        assert_eq!(product.variants().len(), 1);
        assert_eq!(product.variants()[0].sku().as_str(), "WID-001");
        assert!(product.variants()[0].is_active());

        let events = product.pending_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProductEvent::ProductCreated { .. }));
        assert!(matches!(events[1], ProductEvent::VariantAdded { .. }));
    }

    #[test]
    fn test_create_rejects_blank_name_and_nonpositive_price() {
        let slug = Slug::parse("widget").unwrap();
        let result = Product::create("  ", slug.clone(), "", usd(100), None, Metadata::new());
        assert!(matches!(result, Err(CatalogError::InvalidName(_))));

        let result = Product::create("Widget", slug, "", usd(0), None, Metadata::new());
        assert!(matches!(
            result,
            Err(CatalogError::InvalidPrice { cents: 0 })
        ));
    }

    #[test]
    fn test_duplicate_sku_rejected() {
        let mut product = draft_product();
        let result = product.add_variant(
            Sku::parse("wid-001").unwrap(),
            None,
            Vec::new(),
            5,
            Metadata::new(),
        );
        assert!(matches!(result, Err(CatalogError::DuplicateSku { .. })));
    }

    #[test]
    fn test_variant_price_must_match_base_currency() {
        let mut product = draft_product();
        let result = product.add_variant(
            Sku::parse("WID-EUR").unwrap(),
            Some(Money::from_cents(2499, Currency::Eur)),
            Vec::new(),
            0,
            Metadata::new(),
        );
        assert!(matches!(
            result,
            Err(CatalogError::CurrencyMismatch {
                expected: Currency::Usd,
                actual: Currency::Eur,
            })
        ));
    }

    #[test]
    fn test_status_transitions() {
        let mut product = draft_product();
        product.take_events();

        assert!(product.set_status(ProductStatus::Active).is_ok());
        assert!(product.set_status(ProductStatus::Inactive).is_ok());
        assert!(product.set_status(ProductStatus::Active).is_ok());
        assert_eq!(product.pending_events().len(), 3);

        // Active products cannot go back to draft.
        let result = product.set_status(ProductStatus::Draft);
        assert!(matches!(
            result,
            Err(CatalogError::InvalidStatusTransition {
                from: ProductStatus::Active,
                to: ProductStatus::Draft,
            })
        ));
    }

    #[test]
    fn test_archived_is_terminal() {
        let mut product = draft_product();
        product.set_status(ProductStatus::Archived).unwrap();

        assert!(matches!(
            product.set_status(ProductStatus::Active),
            Err(CatalogError::InvalidStatusTransition { .. })
        ));
        assert!(matches!(
            product.change_price(usd(2999)),
            Err(CatalogError::ProductArchived)
        ));
        assert!(matches!(
            product.add_variant(
                Sku::parse("WID-002").unwrap(),
                None,
                Vec::new(),
                0,
                Metadata::new()
            ),
            Err(CatalogError::ProductArchived)
        ));
    }

    #[test]
    fn test_change_price_noop_when_equal() {
        let mut product = active_product();
        product.change_price(usd(1999)).unwrap();
        assert!(product.pending_events().is_empty());

        product.change_price(usd(2499)).unwrap();
        assert_eq!(product.base_price(), usd(2499));
        assert!(matches!(
            product.pending_events()[0],
            ProductEvent::ProductPriceChanged { .. }
        ));
    }

    #[test]
    fn test_category_assignment_is_idempotent() {
        let mut product = active_product();
        let category_id = CategoryId::new();

        product.assign_category(category_id).unwrap();
        product.assign_category(category_id).unwrap();
        assert_eq!(product.category_ids().len(), 1);
        assert_eq!(product.pending_events().len(), 1);

        product.remove_category(category_id).unwrap();
        let result = product.remove_category(category_id);
        assert!(matches!(
            result,
            Err(CatalogError::CategoryNotAssigned { .. })
        ));
    }

    #[test]
    fn test_reserve_requires_active_product() {
        let mut product = draft_product();
        let variant_id = product.variants()[0].id();
        product.adjust_stock(variant_id, 10).unwrap();

        let result = product.reserve_stock(variant_id, 1);
        assert!(matches!(result, Err(CatalogError::ProductNotActive)));
    }

    #[test]
    fn test_reserve_requires_active_variant() {
        let mut product = active_product();
        let variant_id = product.variants()[0].id();
        product.adjust_stock(variant_id, 10).unwrap();
        product.set_variant_active(variant_id, false).unwrap();

        let result = product.reserve_stock(variant_id, 1);
        assert!(matches!(result, Err(CatalogError::VariantInactive { .. })));
    }

    #[test]
    fn test_reserve_release_commit_cycle() {
        let mut product = active_product();
        let variant_id = product.variants()[0].id();
        product.adjust_stock(variant_id, 10).unwrap();
        product.take_events();

        product.reserve_stock(variant_id, 4).unwrap();
        let stock = product.variant(variant_id).unwrap().stock();
        assert_eq!(stock.on_hand(), 10);
        assert_eq!(stock.reserved(), 4);
        assert_eq!(stock.available(), 6);

        product.release_stock(variant_id, 1).unwrap();
        assert_eq!(product.variant(variant_id).unwrap().stock().reserved(), 3);

        product.commit_stock(variant_id, 3).unwrap();
        let stock = product.variant(variant_id).unwrap().stock();
        assert_eq!(stock.on_hand(), 7);
        assert_eq!(stock.reserved(), 0);
        assert_eq!(stock.available(), 7);

        let events = product.take_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ProductEvent::StockReserved { .. }));
        assert!(matches!(events[1], ProductEvent::StockReleased { .. }));
        assert!(matches!(
            events[2],
            ProductEvent::StockCommitted {
                on_hand: 7,
                available: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_reserve_more_than_available_fails() {
        let mut product = active_product();
        let variant_id = product.variants()[0].id();
        product.adjust_stock(variant_id, 3).unwrap();

        let result = product.reserve_stock(variant_id, 4);
        assert!(matches!(
            result,
            Err(CatalogError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_release_more_than_reserved_fails() {
        let mut product = active_product();
        let variant_id = product.variants()[0].id();
        product.adjust_stock(variant_id, 5).unwrap();
        product.reserve_stock(variant_id, 2).unwrap();

        let result = product.release_stock(variant_id, 3);
        assert!(matches!(
            result,
            Err(CatalogError::InsufficientReservation {
                requested: 3,
                reserved: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_adjust_cannot_drop_below_reserved() {
        let mut product = active_product();
        let variant_id = product.variants()[0].id();
        product.adjust_stock(variant_id, 10).unwrap();
        product.reserve_stock(variant_id, 6).unwrap();

        let result = product.adjust_stock(variant_id, -5);
        assert!(matches!(
            result,
            Err(CatalogError::StockBelowReserved {
                would_be: 5,
                reserved: 6,
            })
        ));

        assert_eq!(product.adjust_stock(variant_id, -4).unwrap(), 6);
    }

    #[test]
    fn test_effective_price_prefers_variant_override() {
        let mut product = active_product();
        let default_variant = product.variants()[0].id();
        let premium = product
            .add_variant(
                Sku::parse("WID-XL").unwrap(),
                Some(usd(2999)),
                Vec::new(),
                0,
                Metadata::new(),
            )
            .unwrap();

        assert_eq!(product.effective_price(None).unwrap(), usd(1999));
        assert_eq!(
            product.effective_price(Some(default_variant)).unwrap(),
            usd(1999)
        );
        assert_eq!(product.effective_price(Some(premium)).unwrap(), usd(2999));

        let result = product.effective_price(Some(VariantId::new()));
        assert!(matches!(result, Err(CatalogError::VariantNotFound { .. })));
    }

    #[test]
    fn test_version_bookkeeping() {
        let mut product = draft_product();
        assert_eq!(product.version(), Version::initial());

        product.set_version(Version::first());
        assert_eq!(product.version().as_i64(), 1);
        assert_eq!(Product::aggregate_type(), "product");
        assert_eq!(product.aggregate_id(), product.id().as_uuid());
    }
}
