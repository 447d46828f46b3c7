// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures exchanged with the dashboard and with the store backend.
//
// WIRE FORMAT:
// - JSON, camelCase field names
// - Identifiers are opaque strings; the backend may send `_id` instead of `id`
// - References to other entities arrive either as a bare id or as a
//   populated object, see `EntityRef`
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// BACKEND ENVELOPE
// =============================================================================
// Every backend response is wrapped as
// `{ "success": true, "data": ..., "message": ..., "pagination": ... }`.

/// Response envelope used by the store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_true")]
    pub success: bool,

    pub data: Option<T>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub pagination: Option<Pagination>,

    /// Structured validation details on 400 responses
    #[serde(default)]
    pub errors: Option<Vec<FieldError>>,
}

fn default_true() -> bool {
    true
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
}

/// One entry of a backend validation error array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// List payload returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

// -----------------------------------------------------------------------------
// ENTITY REFERENCE
// -----------------------------------------------------------------------------
/// Reference to another entity: a bare id or a populated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(String),
    Object(RefObject),
}

/// The subset of a populated reference the gateway reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefObject {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl EntityRef {
    /// Id of the referenced entity, whichever form it arrived in
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Id(id) => id,
            EntityRef::Object(obj) => &obj.id,
        }
    }
}

// =============================================================================
// PRODUCTS
// =============================================================================

/// Original/selling price pair with the derived discount percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub original: f64,
    pub selling: f64,
    /// Whole percent; recomputed by the gateway on every write
    #[serde(default)]
    pub discount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVideo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Inventory snapshot embedded in a product document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInventory {
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub reserved: i64,
    #[serde(default)]
    pub available: i64,
    #[serde(default)]
    pub threshold: i64,
    #[serde(default)]
    pub is_out_of_stock: bool,
}

/// A catalog product as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category: Option<EntityRef>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub video: Option<ProductVideo>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub inventory: Option<ProductInventory>,
    /// Set while the product sits in the delete history
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// In the delete history: flagged, or stamped with a delete time
    pub fn is_soft_deleted(&self) -> bool {
        self.is_deleted || self.deleted_at.is_some()
    }
}

/// Create/update body for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<ProductVideo>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    /// Stock on hand; edits flow through to the inventory record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<i64>,
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create/update body for a category. A blank slug is derived from the name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

// =============================================================================
// INVENTORY
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLocation {
    #[serde(default)]
    pub warehouse: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub shelf: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact: String,
    /// Days
    #[serde(default)]
    pub lead_time: i64,
}

/// Three-way stock classification shown on the stock page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "In Stock")]
    InStock,
}

impl StockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::InStock => "In Stock",
        }
    }
}

/// One inventory record per product SKU
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(alias = "_id")]
    pub id: String,
    pub product: EntityRef,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub quantity_available: i64,
    #[serde(default)]
    pub quantity_reserved: i64,
    #[serde(default)]
    pub quantity_locked: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub max_stock_level: i64,
    #[serde(default)]
    pub location: StockLocation,
    #[serde(default)]
    pub supplier: Supplier,
    #[serde(default)]
    pub last_restocked: Option<DateTime<Utc>>,

    // Derived fields. Whatever the backend sent is overwritten by
    // `rules::annotate_item` before the item leaves the gateway.
    #[serde(default)]
    pub is_low_stock: bool,
    #[serde(default)]
    pub is_out_of_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StockStatus>,
}

/// Settings editable from the inventory edit form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySettings {
    pub reorder_level: i64,
    pub max_stock_level: i64,
    pub location: StockLocation,
    pub supplier: Supplier,
}

/// One entry of a bulk settings update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkInventoryEntry {
    pub id: String,
    #[serde(flatten)]
    pub settings: InventorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkInventoryUpdate {
    pub updates: Vec<BulkInventoryEntry>,
}

/// Fixed list of reasons a stock adjustment may be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentReason {
    #[serde(rename = "Received Shipment")]
    ReceivedShipment,
    #[serde(rename = "Damaged Goods")]
    DamagedGoods,
    #[serde(rename = "Theft/Loss")]
    TheftLoss,
    #[serde(rename = "Returned Items")]
    ReturnedItems,
    #[serde(rename = "Inventory Count Correction")]
    CountCorrection,
    #[serde(rename = "Expired Products")]
    ExpiredProducts,
    #[serde(rename = "Sample/Demo Usage")]
    SampleUsage,
    #[serde(rename = "Transfer to Another Location")]
    Transfer,
    #[serde(rename = "Quality Control Rejection")]
    QualityControlRejection,
    #[serde(rename = "Other")]
    Other,
}

impl AdjustmentReason {
    pub const ALL: [AdjustmentReason; 10] = [
        AdjustmentReason::ReceivedShipment,
        AdjustmentReason::DamagedGoods,
        AdjustmentReason::TheftLoss,
        AdjustmentReason::ReturnedItems,
        AdjustmentReason::CountCorrection,
        AdjustmentReason::ExpiredProducts,
        AdjustmentReason::SampleUsage,
        AdjustmentReason::Transfer,
        AdjustmentReason::QualityControlRejection,
        AdjustmentReason::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentReason::ReceivedShipment => "Received Shipment",
            AdjustmentReason::DamagedGoods => "Damaged Goods",
            AdjustmentReason::TheftLoss => "Theft/Loss",
            AdjustmentReason::ReturnedItems => "Returned Items",
            AdjustmentReason::CountCorrection => "Inventory Count Correction",
            AdjustmentReason::ExpiredProducts => "Expired Products",
            AdjustmentReason::SampleUsage => "Sample/Demo Usage",
            AdjustmentReason::Transfer => "Transfer to Another Location",
            AdjustmentReason::QualityControlRejection => "Quality Control Rejection",
            AdjustmentReason::Other => "Other",
        }
    }
}

/// Manual stock adjustment from the stock page
///
/// # Example JSON
/// ```json
/// { "adjustment": -5, "reason": "Damaged Goods", "notes": "forklift" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    /// Signed delta applied to `quantityAvailable`
    pub adjustment: i64,
    pub reason: AdjustmentReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body sent to `POST /inventory/:id/adjust`.
///
/// Order-driven adjustments carry free-text reasons, so the backend payload
/// is not tied to `AdjustmentReason`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub adjustment: i64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// ORDERS
// =============================================================================

/// Canonical order status.
///
/// The backend has been seen emitting both `pending/shipped/...` and
/// `PENDING/PAID/SHIPPED/...`; both deserialize here, output is lowercase.
/// Anything else (`refunded`, `returned`, ...) reads as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[serde(alias = "PENDING")]
    Pending,
    #[serde(alias = "CONFIRMED")]
    Confirmed,
    #[serde(alias = "PROCESSING")]
    Processing,
    #[serde(alias = "PAID")]
    Paid,
    #[serde(alias = "SHIPPED")]
    Shipped,
    #[serde(alias = "DELIVERED")]
    Delivered,
    #[serde(alias = "CANCELLED", alias = "canceled", alias = "CANCELED")]
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: EntityRef,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default, alias = "user")]
    pub customer: Option<EntityRef>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub totals: OrderTotals,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// =============================================================================
// USERS & AUTH
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Customer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Token plus the signed-in user, as returned by login/register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

// =============================================================================
// PAYMENT VERIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub order_id: Option<EntityRef>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub amount: f64,
    /// Base64 data or a stored file URL
    #[serde(default)]
    pub screenshot: Option<String>,
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub verified_by: Option<EntityRef>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub order_cancelled_due_to_fraud: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Reasons an admin may reject a payment proof for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    #[serde(rename = "Invalid Screenshot")]
    InvalidScreenshot,
    #[serde(rename = "Amount Mismatch")]
    AmountMismatch,
    #[serde(rename = "Transaction Not Found")]
    TransactionNotFound,
    #[serde(rename = "Duplicate Submission")]
    DuplicateSubmission,
    #[serde(rename = "Suspected Fraud")]
    SuspectedFraud,
    #[serde(rename = "Unreadable Image")]
    UnreadableImage,
    #[serde(rename = "Other")]
    Other,
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 7] = [
        RejectionReason::InvalidScreenshot,
        RejectionReason::AmountMismatch,
        RejectionReason::TransactionNotFound,
        RejectionReason::DuplicateSubmission,
        RejectionReason::SuspectedFraud,
        RejectionReason::UnreadableImage,
        RejectionReason::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::InvalidScreenshot => "Invalid Screenshot",
            RejectionReason::AmountMismatch => "Amount Mismatch",
            RejectionReason::TransactionNotFound => "Transaction Not Found",
            RejectionReason::DuplicateSubmission => "Duplicate Submission",
            RejectionReason::SuspectedFraud => "Suspected Fraud",
            RejectionReason::UnreadableImage => "Unreadable Image",
            RejectionReason::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveVerificationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectVerificationRequest {
    pub reason: RejectionReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    /// Cancel the linked order as a fraud response
    #[serde(default)]
    pub cancel_order: bool,
}

/// Body sent to `POST /admin/payment-verifications/:id/reject`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionPayload {
    pub rejection_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub cancel_order: bool,
}

// =============================================================================
// ORDER → INVENTORY SYNC
// =============================================================================

/// Outcome of one order-driven reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Lower bound of the `updatedSince` window
    pub since: DateTime<Utc>,
    pub orders_scanned: usize,
    pub adjustments_applied: usize,
    /// Line items whose status needs no stock movement
    pub skipped_items: usize,
    pub failures: Vec<SyncFailure>,
}

/// A line item adjustment that could not be applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub order_id: String,
    pub product_id: String,
    pub delta: i64,
    pub error: String,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Detailed readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

/// Individual dependency health checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub store_api: bool,
    pub redis: bool,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details
    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}
