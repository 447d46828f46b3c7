// =============================================================================
// RULES MODULE
// =============================================================================
// Pure business rules for the admin console. No I/O happens here: handlers
// and the order sync call these functions before anything is sent to the
// store backend.
//
// RULES COVERED:
// - Price discount derivation
// - Stock status classification and adjustment bounds
// - Inventory settings validation
// - Category slug derivation and validation
// - Product form validation and normalization
// - Product delete lifecycle (active → soft-deleted → permanently deleted)
// - Order status → signed stock delta
// - User delete guard, payment verification one-shot decisions
// =============================================================================

use thiserror::Error;

use crate::models::{
    Category, CategoryInput, InventoryItem, InventorySettings, Order, OrderStatus,
    PaymentVerification, Product, ProductInput, RejectVerificationRequest, RejectionReason,
    StockStatus, User, UserRole, VerificationStatus,
};

// =============================================================================
// RULE VIOLATIONS
// =============================================================================
/// A request that breaks a business rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// A single form field is missing or out of range
    #[error("{field}: {message}")]
    Field {
        field: &'static str,
        message: String,
    },

    #[error("Adjustment must not be zero")]
    ZeroAdjustment,

    #[error("Adjustment of {delta} would leave {resulting} units, stock cannot go below 0")]
    NegativeStock { delta: i64, resulting: i64 },

    #[error("Adjustment would leave {resulting} units, above the maximum stock level of {max}")]
    ExceedsMaxStock { resulting: i64, max: i64 },

    #[error("Maximum stock level ({max_stock_level}) must be greater than reorder level ({reorder_level})")]
    ReorderNotBelowMax {
        reorder_level: i64,
        max_stock_level: i64,
    },

    #[error("Slug '{0}' is already used by another category")]
    DuplicateSlug(String),

    #[error("Cannot {action} a product that is {state}")]
    IllegalTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Admin accounts cannot be deleted, change the role first")]
    AdminNotDeletable,

    #[error("Payment verification was already {0}")]
    AlreadyDecided(&'static str),
}

impl RuleViolation {
    fn field(field: &'static str, message: impl Into<String>) -> Self {
        RuleViolation::Field {
            field,
            message: message.into(),
        }
    }
}

pub type RuleResult<T> = Result<T, RuleViolation>;

// =============================================================================
// PRICING
// =============================================================================
/// Whole-percent discount of `selling` against `original`.
///
/// Zero whenever the selling price is not below the original.
///
/// # Example
/// ```ignore
/// assert_eq!(discount_percent(1000.0, 750.0), 25);
/// ```
pub fn discount_percent(original: f64, selling: f64) -> u32 {
    if original > 0.0 && original > selling {
        ((original - selling) / original * 100.0).round() as u32
    } else {
        0
    }
}

// =============================================================================
// STOCK
// =============================================================================

pub fn is_out_of_stock(quantity_available: i64) -> bool {
    quantity_available <= 0
}

pub fn is_low_stock(quantity_available: i64, reorder_level: i64) -> bool {
    quantity_available <= reorder_level
}

/// Classify stock. Out of stock wins over low stock.
pub fn classify_stock(quantity_available: i64, reorder_level: i64) -> StockStatus {
    if is_out_of_stock(quantity_available) {
        StockStatus::OutOfStock
    } else if is_low_stock(quantity_available, reorder_level) {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

/// Overwrite the derived flags of an item with values computed here
pub fn annotate_item(item: &mut InventoryItem) {
    item.is_out_of_stock = is_out_of_stock(item.quantity_available);
    item.is_low_stock = is_low_stock(item.quantity_available, item.reorder_level);
    item.status = Some(classify_stock(item.quantity_available, item.reorder_level));
}

/// Inclusive range of deltas an adjustment may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentBounds {
    pub min: i64,
    pub max: i64,
}

/// `[-quantityAvailable, maxStockLevel - quantityAvailable]`
pub fn adjustment_bounds(quantity_available: i64, max_stock_level: i64) -> AdjustmentBounds {
    AdjustmentBounds {
        min: quantity_available.saturating_neg(),
        max: max_stock_level.saturating_sub(quantity_available),
    }
}

/// Check a manual adjustment and return the resulting quantity
pub fn check_adjustment(item: &InventoryItem, delta: i64) -> RuleResult<i64> {
    if delta == 0 {
        return Err(RuleViolation::ZeroAdjustment);
    }

    let bounds = adjustment_bounds(item.quantity_available, item.max_stock_level);
    let resulting = item.quantity_available.saturating_add(delta);
    if delta < bounds.min {
        return Err(RuleViolation::NegativeStock { delta, resulting });
    }
    if delta > bounds.max {
        return Err(RuleViolation::ExceedsMaxStock {
            resulting,
            max: item.max_stock_level,
        });
    }

    Ok(resulting)
}

/// Validate the inventory edit form
pub fn validate_inventory_settings(settings: &InventorySettings) -> RuleResult<()> {
    if settings.reorder_level < 0 {
        return Err(RuleViolation::field(
            "reorderLevel",
            "must be zero or greater",
        ));
    }
    if settings.max_stock_level <= settings.reorder_level {
        return Err(RuleViolation::ReorderNotBelowMax {
            reorder_level: settings.reorder_level,
            max_stock_level: settings.max_stock_level,
        });
    }

    let required = [
        ("location.warehouse", &settings.location.warehouse),
        ("location.section", &settings.location.section),
        ("location.shelf", &settings.location.shelf),
        ("supplier.name", &settings.supplier.name),
        ("supplier.contact", &settings.supplier.contact),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(RuleViolation::field(field, "is required"));
        }
    }

    if settings.supplier.lead_time < 0 {
        return Err(RuleViolation::field(
            "supplier.leadTime",
            "must be zero or greater",
        ));
    }

    Ok(())
}

// =============================================================================
// CATEGORIES
// =============================================================================
/// Derive a URL slug: lowercase ASCII alphanumerics joined by single dashes.
///
/// "Home & Garden" becomes "home-garden".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// A slug is non-empty lowercase alphanumerics separated by single dashes
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

/// Validate and normalize a category form.
///
/// `existing` is the current category list; `editing_id` excludes the
/// category being edited from the uniqueness check.
pub fn prepare_category(
    mut input: CategoryInput,
    existing: &[Category],
    editing_id: Option<&str>,
) -> RuleResult<CategoryInput> {
    input.name = input.name.trim().to_string();
    if input.name.chars().count() < 2 {
        return Err(RuleViolation::field("name", "must be at least 2 characters"));
    }

    input.slug = input.slug.trim().to_string();
    if input.slug.is_empty() {
        input.slug = slugify(&input.name);
    }
    if !is_valid_slug(&input.slug) {
        return Err(RuleViolation::field(
            "slug",
            "must contain only lowercase letters, digits and single dashes",
        ));
    }

    if input.sort_order < 0 {
        return Err(RuleViolation::field("sortOrder", "must be zero or greater"));
    }

    let taken = existing
        .iter()
        .any(|c| c.slug == input.slug && Some(c.id.as_str()) != editing_id);
    if taken {
        return Err(RuleViolation::DuplicateSlug(input.slug));
    }

    Ok(input)
}

// =============================================================================
// PRODUCTS
// =============================================================================
/// Validate and normalize a product form.
///
/// On success the discount is recomputed and exactly one image is primary.
pub fn prepare_product(mut input: ProductInput) -> RuleResult<ProductInput> {
    input.name = input.name.trim().to_string();
    if input.name.chars().count() < 3 {
        return Err(RuleViolation::field("name", "must be at least 3 characters"));
    }
    if input.description.trim().chars().count() < 10 {
        return Err(RuleViolation::field(
            "description",
            "must be at least 10 characters",
        ));
    }
    if input.category.trim().is_empty() {
        return Err(RuleViolation::field("category", "is required"));
    }
    if input.images.is_empty() {
        return Err(RuleViolation::field("images", "at least one image is required"));
    }

    let price = &mut input.price;
    if !(price.original > 0.0) {
        return Err(RuleViolation::field("price.original", "must be greater than 0"));
    }
    if !(price.selling > 0.0) {
        return Err(RuleViolation::field("price.selling", "must be greater than 0"));
    }
    if price.selling > price.original {
        return Err(RuleViolation::field(
            "price.selling",
            "cannot be greater than the original price",
        ));
    }
    price.discount = discount_percent(price.original, price.selling);

    if let Some(quantity) = input.quantity {
        if quantity < 0 {
            return Err(RuleViolation::field("quantity", "must be zero or greater"));
        }
    }
    if let Some(threshold) = input.low_stock_threshold {
        if threshold < 0 {
            return Err(RuleViolation::field(
                "lowStockThreshold",
                "must be zero or greater",
            ));
        }
    }
    if input.specifications.iter().any(|s| s.key.trim().is_empty()) {
        return Err(RuleViolation::field(
            "specifications",
            "every specification needs a key",
        ));
    }

    // Keep the first image flagged primary, or the first one if none is
    let primary = input.images.iter().position(|img| img.is_primary).unwrap_or(0);
    for (idx, image) in input.images.iter_mut().enumerate() {
        image.is_primary = idx == primary;
    }

    input.tags = input
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(input)
}

/// Where a product sits in its delete lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductLifecycle {
    Active,
    SoftDeleted,
    PermanentlyDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductAction {
    SoftDelete,
    Restore,
    PermanentDelete,
}

impl ProductLifecycle {
    pub fn of(product: &Product) -> Self {
        if product.is_soft_deleted() {
            ProductLifecycle::SoftDeleted
        } else {
            ProductLifecycle::Active
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ProductLifecycle::Active => "active",
            ProductLifecycle::SoftDeleted => "in the delete history",
            ProductLifecycle::PermanentlyDeleted => "permanently deleted",
        }
    }

    /// Apply an action, returning the next state
    pub fn apply(self, action: ProductAction) -> RuleResult<ProductLifecycle> {
        use ProductAction::*;
        use ProductLifecycle::*;

        match (self, action) {
            (Active, SoftDelete) => Ok(SoftDeleted),
            (SoftDeleted, Restore) => Ok(Active),
            (SoftDeleted, PermanentDelete) => Ok(PermanentlyDeleted),
            (state, action) => Err(RuleViolation::IllegalTransition {
                state: state.describe(),
                action: match action {
                    SoftDelete => "delete",
                    Restore => "restore",
                    PermanentDelete => "permanently delete",
                },
            }),
        }
    }
}

// =============================================================================
// ORDERS → INVENTORY
// =============================================================================

pub const RESERVED_REASON: &str = "Order confirmed - Stock reserved";
pub const RETURNED_REASON: &str = "Order cancelled - Stock returned";

/// Signed stock movement for one order line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub order_id: String,
    pub product_id: String,
    pub delta: i64,
    pub reason: &'static str,
}

/// Sign and reason of the stock movement a status causes, if any.
///
/// Delivered orders were already reserved when confirmed, so they move
/// nothing; statuses not listed are skipped.
pub fn status_stock_effect(status: OrderStatus) -> Option<(i64, &'static str)> {
    match status {
        OrderStatus::Confirmed | OrderStatus::Processing => Some((-1, RESERVED_REASON)),
        OrderStatus::Cancelled => Some((1, RETURNED_REASON)),
        _ => None,
    }
}

/// Only statuses the dashboard knows can be written back
pub fn check_status_update(status: OrderStatus) -> RuleResult<()> {
    if status == OrderStatus::Unknown {
        return Err(RuleViolation::field(
            "status",
            "must be one of pending, confirmed, processing, paid, shipped, delivered, cancelled",
        ));
    }
    Ok(())
}

/// Per-line stock deltas an order's current status calls for
pub fn order_stock_deltas(order: &Order) -> Vec<StockDelta> {
    let Some((sign, reason)) = status_stock_effect(order.status) else {
        return Vec::new();
    };

    order
        .items
        .iter()
        .filter(|item| item.quantity > 0)
        .map(|item| StockDelta {
            order_id: order.id.clone(),
            product_id: item.product.id().to_string(),
            delta: sign * item.quantity,
            reason,
        })
        .collect()
}

// =============================================================================
// USERS
// =============================================================================
pub fn ensure_user_deletable(user: &User) -> RuleResult<()> {
    match user.role {
        UserRole::Admin => Err(RuleViolation::AdminNotDeletable),
        UserRole::Customer => Ok(()),
    }
}

// =============================================================================
// PAYMENT VERIFICATION
// =============================================================================
/// Decisions are one-shot: only a pending verification may be decided
pub fn ensure_pending(verification: &PaymentVerification) -> RuleResult<()> {
    match verification.verification_status {
        VerificationStatus::Pending => Ok(()),
        VerificationStatus::Verified => Err(RuleViolation::AlreadyDecided("verified")),
        VerificationStatus::Rejected => Err(RuleViolation::AlreadyDecided("rejected")),
    }
}

pub fn validate_rejection(request: &RejectVerificationRequest) -> RuleResult<()> {
    let has_note = request
        .admin_notes
        .as_deref()
        .is_some_and(|n| !n.trim().is_empty());

    if request.reason == RejectionReason::Other && !has_note {
        return Err(RuleViolation::field(
            "adminNotes",
            "a note is required when the reason is Other",
        ));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EntityRef, OrderItem, OrderTotals, Price, ProductImage, Specification, StockLocation,
        Supplier,
    };

    fn item(available: i64, reorder: i64, max: i64) -> InventoryItem {
        InventoryItem {
            id: "inv-1".into(),
            product: EntityRef::Id("p-1".into()),
            sku: "SKU-1".into(),
            quantity_available: available,
            quantity_reserved: 0,
            quantity_locked: 0,
            reorder_level: reorder,
            max_stock_level: max,
            location: StockLocation::default(),
            supplier: Supplier::default(),
            last_restocked: None,
            is_low_stock: false,
            is_out_of_stock: false,
            status: None,
        }
    }

    fn settings(reorder: i64, max: i64) -> InventorySettings {
        InventorySettings {
            reorder_level: reorder,
            max_stock_level: max,
            location: StockLocation {
                warehouse: "Main".into(),
                section: "A".into(),
                shelf: "3".into(),
            },
            supplier: Supplier {
                name: "Acme".into(),
                contact: "orders@acme.test".into(),
                lead_time: 5,
            },
        }
    }

    fn product_input() -> ProductInput {
        ProductInput {
            name: "Ceramic Vase".into(),
            description: "Hand-glazed vase, 30cm tall".into(),
            sku: None,
            price: Price {
                original: 1000.0,
                selling: 750.0,
                discount: 0,
            },
            category: "cat-1".into(),
            images: vec![
                ProductImage {
                    url: "https://cdn.test/a.jpg".into(),
                    alt: None,
                    is_primary: false,
                },
                ProductImage {
                    url: "https://cdn.test/b.jpg".into(),
                    alt: None,
                    is_primary: false,
                },
            ],
            video: None,
            tags: vec![" decor ".into(), "".into()],
            specifications: vec![],
            dimensions: None,
            is_active: true,
            is_featured: false,
            quantity: Some(10),
            low_stock_threshold: None,
        }
    }

    fn order(status: OrderStatus, lines: &[(&str, i64)]) -> Order {
        Order {
            id: "o-1".into(),
            order_number: Some("ORD-1".into()),
            customer: None,
            items: lines
                .iter()
                .map(|(product, quantity)| OrderItem {
                    product: EntityRef::Id(product.to_string()),
                    sku: None,
                    name: None,
                    quantity: *quantity,
                    price: 10.0,
                    total: 10.0 * *quantity as f64,
                })
                .collect(),
            totals: OrderTotals::default(),
            shipping_address: None,
            status,
            payment_status: None,
            payment_method: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn category(id: &str, slug: &str) -> Category {
        Category {
            id: id.into(),
            name: slug.into(),
            slug: slug.into(),
            description: String::new(),
            image: None,
            is_active: true,
            sort_order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    // -------------------------------------------------------------------------
    // PRICING
    // -------------------------------------------------------------------------

    #[test]
    fn discount_matches_rounded_percentage() {
        assert_eq!(discount_percent(1000.0, 750.0), 25);
        assert_eq!(discount_percent(3.0, 2.0), 33);
        assert_eq!(discount_percent(80.0, 20.0), 75);
        assert_eq!(discount_percent(999.0, 666.0), 33);
    }

    #[test]
    fn discount_is_zero_when_selling_not_below_original() {
        assert_eq!(discount_percent(500.0, 500.0), 0);
        assert_eq!(discount_percent(500.0, 650.0), 0);
        assert_eq!(discount_percent(0.0, 0.0), 0);
    }

    // -------------------------------------------------------------------------
    // STOCK
    // -------------------------------------------------------------------------

    #[test]
    fn classification_is_exclusive_and_out_of_stock_wins() {
        for available in -5..=30 {
            for reorder in 0..=20 {
                let status = classify_stock(available, reorder);
                let expected = if available <= 0 {
                    StockStatus::OutOfStock
                } else if available <= reorder {
                    StockStatus::LowStock
                } else {
                    StockStatus::InStock
                };
                assert_eq!(status, expected, "available={available} reorder={reorder}");
            }
        }
        // reorder level above zero stock still reports out of stock
        assert_eq!(classify_stock(0, 10), StockStatus::OutOfStock);
        assert_eq!(classify_stock(10, 10), StockStatus::LowStock);
    }

    #[test]
    fn annotate_overwrites_backend_flags() {
        let mut it = item(0, 5, 100);
        it.is_out_of_stock = false;
        it.is_low_stock = false;
        annotate_item(&mut it);
        assert!(it.is_out_of_stock);
        assert!(it.is_low_stock);
        assert_eq!(it.status, Some(StockStatus::OutOfStock));
    }

    #[test]
    fn adjustment_bounds_cover_zero_to_max() {
        let bounds = adjustment_bounds(750, 1000);
        assert_eq!(bounds, AdjustmentBounds { min: -750, max: 250 });
    }

    #[test]
    fn adjustment_scenario_drains_to_zero_then_rejects() {
        let mut it = item(750, 50, 1000);

        let resulting = check_adjustment(&it, -750).unwrap();
        assert_eq!(resulting, 0);

        it.quantity_available = resulting;
        annotate_item(&mut it);
        assert!(it.is_out_of_stock);

        assert_eq!(
            check_adjustment(&it, -1),
            Err(RuleViolation::NegativeStock {
                delta: -1,
                resulting: -1
            })
        );
    }

    #[test]
    fn adjustment_never_leaves_bounds() {
        let it = item(40, 10, 100);
        for delta in -200..=200 {
            match check_adjustment(&it, delta) {
                Ok(resulting) => assert!((0..=100).contains(&resulting)),
                Err(_) => {
                    let resulting = 40 + delta;
                    assert!(delta == 0 || resulting < 0 || resulting > 100);
                }
            }
        }
    }

    #[test]
    fn adjustment_above_max_is_rejected() {
        let it = item(990, 10, 1000);
        assert_eq!(check_adjustment(&it, 10), Ok(1000));
        assert_eq!(
            check_adjustment(&it, 11),
            Err(RuleViolation::ExceedsMaxStock {
                resulting: 1001,
                max: 1000
            })
        );
        assert_eq!(check_adjustment(&it, 0), Err(RuleViolation::ZeroAdjustment));
    }

    #[test]
    fn extreme_adjustments_are_rejected_without_overflow() {
        let it = item(5, 1, 10);
        assert!(matches!(
            check_adjustment(&it, i64::MAX),
            Err(RuleViolation::ExceedsMaxStock { max: 10, .. })
        ));
        assert!(matches!(
            check_adjustment(&it, i64::MIN),
            Err(RuleViolation::NegativeStock { .. })
        ));
    }

    #[test]
    fn settings_reject_max_not_above_reorder() {
        assert!(validate_inventory_settings(&settings(10, 11)).is_ok());
        assert_eq!(
            validate_inventory_settings(&settings(10, 10)),
            Err(RuleViolation::ReorderNotBelowMax {
                reorder_level: 10,
                max_stock_level: 10
            })
        );
        assert!(validate_inventory_settings(&settings(10, 3)).is_err());
    }

    #[test]
    fn settings_require_location_and_supplier() {
        let mut s = settings(5, 50);
        s.location.shelf = "  ".into();
        assert!(matches!(
            validate_inventory_settings(&s),
            Err(RuleViolation::Field { field: "location.shelf", .. })
        ));

        let mut s = settings(5, 50);
        s.supplier.contact.clear();
        assert!(matches!(
            validate_inventory_settings(&s),
            Err(RuleViolation::Field { field: "supplier.contact", .. })
        ));

        let mut s = settings(5, 50);
        s.supplier.lead_time = -1;
        assert!(validate_inventory_settings(&s).is_err());
    }

    // -------------------------------------------------------------------------
    // CATEGORIES
    // -------------------------------------------------------------------------

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Home & Garden"), "home-garden");
        assert_eq!(slugify("  Kids' Toys -- 2024 "), "kids-toys-2024");
        assert_eq!(slugify("Électronique"), "lectronique");
        assert_eq!(slugify("&&&"), "");
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("home-garden"));
        assert!(is_valid_slug("a1"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Home"));
        assert!(!is_valid_slug("home--garden"));
        assert!(!is_valid_slug("-home"));
    }

    #[test]
    fn category_slug_is_derived_and_must_be_unique() {
        let input = CategoryInput {
            name: "Home & Garden".into(),
            slug: String::new(),
            description: String::new(),
            image: None,
            is_active: true,
            sort_order: 0,
        };

        let prepared = prepare_category(input.clone(), &[], None).unwrap();
        assert_eq!(prepared.slug, "home-garden");

        let existing = vec![category("c-9", "home-garden")];
        assert_eq!(
            prepare_category(input.clone(), &existing, None).unwrap_err(),
            RuleViolation::DuplicateSlug("home-garden".into())
        );

        // Editing the owner of the slug is fine
        assert!(prepare_category(input, &existing, Some("c-9")).is_ok());
    }

    #[test]
    fn category_with_unsluggable_name_is_rejected() {
        let input = CategoryInput {
            name: "&&".into(),
            slug: String::new(),
            description: String::new(),
            image: None,
            is_active: true,
            sort_order: 0,
        };
        assert!(matches!(
            prepare_category(input, &[], None),
            Err(RuleViolation::Field { field: "slug", .. })
        ));
    }

    // -------------------------------------------------------------------------
    // PRODUCTS
    // -------------------------------------------------------------------------

    #[test]
    fn product_is_normalized() {
        let prepared = prepare_product(product_input()).unwrap();
        assert_eq!(prepared.price.discount, 25);
        assert!(prepared.images[0].is_primary);
        assert!(!prepared.images[1].is_primary);
        assert_eq!(prepared.tags, vec!["decor".to_string()]);
    }

    #[test]
    fn product_keeps_chosen_primary_image() {
        let mut input = product_input();
        input.images[0].is_primary = true;
        input.images[1].is_primary = true;
        let prepared = prepare_product(input).unwrap();
        let primaries = prepared.images.iter().filter(|i| i.is_primary).count();
        assert_eq!(primaries, 1);
        assert!(prepared.images[0].is_primary);
    }

    #[test]
    fn product_price_rules() {
        let mut input = product_input();
        input.price.selling = 1200.0;
        assert!(matches!(
            prepare_product(input),
            Err(RuleViolation::Field { field: "price.selling", .. })
        ));

        let mut input = product_input();
        input.price.original = 0.0;
        assert!(prepare_product(input).is_err());

        let mut input = product_input();
        input.price.selling = 1000.0;
        assert_eq!(prepare_product(input).unwrap().price.discount, 0);
    }

    #[test]
    fn product_requires_category_images_and_keys() {
        let mut input = product_input();
        input.category = " ".into();
        assert!(prepare_product(input).is_err());

        let mut input = product_input();
        input.images.clear();
        assert!(matches!(
            prepare_product(input),
            Err(RuleViolation::Field { field: "images", .. })
        ));

        let mut input = product_input();
        input.specifications.push(Specification {
            key: "".into(),
            value: "steel".into(),
        });
        assert!(prepare_product(input).is_err());

        let mut input = product_input();
        input.quantity = Some(-1);
        assert!(prepare_product(input).is_err());
    }

    #[test]
    fn delete_lifecycle() {
        use ProductAction::*;
        use ProductLifecycle::*;

        assert_eq!(Active.apply(SoftDelete), Ok(SoftDeleted));
        assert_eq!(SoftDeleted.apply(Restore), Ok(Active));
        assert_eq!(SoftDeleted.apply(PermanentDelete), Ok(PermanentlyDeleted));

        // restore happens once: a restored product cannot be restored again
        let restored = SoftDeleted.apply(Restore).unwrap();
        assert!(restored.apply(Restore).is_err());

        assert!(Active.apply(PermanentDelete).is_err());
        assert!(SoftDeleted.apply(SoftDelete).is_err());
        for action in [SoftDelete, Restore, PermanentDelete] {
            assert!(PermanentlyDeleted.apply(action).is_err());
        }
    }

    // -------------------------------------------------------------------------
    // ORDERS
    // -------------------------------------------------------------------------

    #[test]
    fn confirmed_order_reserves_stock() {
        let deltas = order_stock_deltas(&order(OrderStatus::Confirmed, &[("p-1", 2), ("p-2", 5)]));
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].delta, -2);
        assert_eq!(deltas[1].delta, -5);
        assert_eq!(deltas[0].reason, RESERVED_REASON);
        assert_eq!(deltas[1].product_id, "p-2");
    }

    #[test]
    fn cancellation_after_reservation_nets_to_zero() {
        for reserving in [OrderStatus::Confirmed, OrderStatus::Processing] {
            let reserved = order_stock_deltas(&order(reserving, &[("p-1", 3)]));
            let returned = order_stock_deltas(&order(OrderStatus::Cancelled, &[("p-1", 3)]));
            assert_eq!(returned[0].reason, RETURNED_REASON);
            let net: i64 = reserved.iter().chain(returned.iter()).map(|d| d.delta).sum();
            assert_eq!(net, 0);
        }
    }

    #[test]
    fn other_statuses_move_nothing() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert!(order_stock_deltas(&order(status, &[("p-1", 3)])).is_empty());
        }
    }

    #[test]
    fn unknown_status_is_skipped_and_cannot_be_written() {
        assert!(order_stock_deltas(&order(OrderStatus::Unknown, &[("p-1", 3)])).is_empty());

        assert!(matches!(
            check_status_update(OrderStatus::Unknown),
            Err(RuleViolation::Field { field: "status", .. })
        ));
        assert!(check_status_update(OrderStatus::Shipped).is_ok());
    }

    #[test]
    fn zero_quantity_lines_are_ignored() {
        let deltas = order_stock_deltas(&order(OrderStatus::Processing, &[("p-1", 0), ("p-2", 1)]));
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].product_id, "p-2");
    }

    // -------------------------------------------------------------------------
    // USERS & PAYMENTS
    // -------------------------------------------------------------------------

    #[test]
    fn admins_cannot_be_deleted() {
        let mut user = User {
            id: "u-1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role: UserRole::Admin,
            is_email_verified: true,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(ensure_user_deletable(&user), Err(RuleViolation::AdminNotDeletable));

        user.role = UserRole::Customer;
        assert!(ensure_user_deletable(&user).is_ok());
    }

    #[test]
    fn verification_decisions_are_one_shot() {
        let mut v = PaymentVerification {
            id: "pv-1".into(),
            order_id: Some(EntityRef::Id("o-1".into())),
            transaction_id: Some("TX-1".into()),
            amount: 120.0,
            screenshot: None,
            verification_status: VerificationStatus::Pending,
            verified_by: None,
            verified_at: None,
            rejection_reason: None,
            admin_notes: None,
            order_cancelled_due_to_fraud: false,
            created_at: None,
        };
        assert!(ensure_pending(&v).is_ok());

        v.verification_status = VerificationStatus::Verified;
        assert_eq!(ensure_pending(&v), Err(RuleViolation::AlreadyDecided("verified")));

        v.verification_status = VerificationStatus::Rejected;
        assert_eq!(ensure_pending(&v), Err(RuleViolation::AlreadyDecided("rejected")));
    }

    #[test]
    fn rejection_for_other_needs_a_note() {
        let mut req = RejectVerificationRequest {
            reason: RejectionReason::Other,
            admin_notes: Some("  ".into()),
            cancel_order: false,
        };
        assert!(validate_rejection(&req).is_err());

        req.admin_notes = Some("screenshot is from another shop".into());
        assert!(validate_rejection(&req).is_ok());

        req.reason = RejectionReason::AmountMismatch;
        req.admin_notes = None;
        assert!(validate_rejection(&req).is_ok());
    }
}
