use crate::{
    db::{DbPool, TrackedTransaction},
    entities::{product, purchase, purchase_item},
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::{catalog, inventory_ledger, seller_accounts},
    services::{
        cart_validator::{validate_cart, CartInput, ValidatedCart},
        pricing,
        seller_payouts::SellerSubtotals,
    },
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

/// Snapshot of one purchased line as returned to the buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedItemView {
    #[schema(example = "7")]
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub qty: i32,
    /// Unit price at purchase time, rounded to a whole amount
    #[schema(example = 15000)]
    pub price: i64,
    pub sku: String,
    /// Empty when the product has no media
    pub file_id: String,
    pub file_uri: String,
    pub file_thumbnail_uri: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where to send one seller's share of the purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellerPaymentInstruction {
    #[schema(example = "12")]
    pub seller_id: String,
    pub bank_account_name: String,
    pub bank_account_holder: String,
    pub bank_account_number: String,
    #[schema(example = 30000)]
    pub total_price: i64,
}

/// Result of a successful purchase creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    #[schema(example = "1")]
    pub purchase_id: String,
    pub purchased_items: Vec<PurchasedItemView>,
    #[schema(example = 30000)]
    pub total_price: i64,
    /// Ascending by seller id; positional proofs are paired in this order
    pub payment_details: Vec<SellerPaymentInstruction>,
}

/// Creates purchases: validates the cart, places holds on stock and records
/// the financial snapshot, all in one transaction.
#[derive(Clone)]
pub struct PurchaseService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    lock_timeout: Option<Duration>,
}

impl PurchaseService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            lock_timeout,
        }
    }

    /// Validates the raw request, then creates the purchase.
    pub async fn submit(&self, input: CartInput) -> Result<PurchaseReceipt, ServiceError> {
        let cart = validate_cart(input)?;
        self.create_order(cart).await
    }

    #[instrument(skip(self, cart), fields(lines = cart.lines.len()))]
    pub async fn create_order(&self, cart: ValidatedCart) -> Result<PurchaseReceipt, ServiceError> {
        let txn =
            TrackedTransaction::begin(&self.db_pool, "create_purchase", self.lock_timeout).await?;
        let outcome = build_order(txn.conn(), &cart).await;
        let (receipt, purchase_id, seller_ids) = txn.settle(outcome).await.map_err(|e| {
            counter!("tutuplapak.purchases.rejected", 1, "reason" => e.code());
            e
        })?;

        counter!("tutuplapak.purchases.created", 1);
        info!(
            purchase_id,
            total = receipt.total_price,
            sellers = seller_ids.len(),
            "Purchase created"
        );

        if let Some(event_sender) = &self.event_sender {
            event_sender
                .send_or_log(Event::PurchaseCreated {
                    purchase_id,
                    total: receipt.total_price,
                    seller_ids,
                    timestamp: Utc::now(),
                })
                .await;
        }

        Ok(receipt)
    }
}

/// Everything between `BEGIN` and `COMMIT` for a purchase creation.
async fn build_order<C>(
    conn: &C,
    cart: &ValidatedCart,
) -> Result<(PurchaseReceipt, i32, Vec<i32>), ServiceError>
where
    C: ConnectionTrait,
{
    let requested = cart.requested_per_product();

    // Lock every product before deciding anything about any of them.
    let mut products: HashMap<i32, product::Model> = HashMap::with_capacity(requested.len());
    for product_id in inventory_ledger::lock_order(requested.keys().copied()) {
        let product = inventory_ledger::lock_product_for_update(conn, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))?;

        let held = inventory_ledger::outstanding_holds(conn, product_id).await?;
        let available = i64::from(product.qty) - held;
        let wanted = requested.get(&product_id).copied().unwrap_or_default();
        if available < wanted {
            return Err(ServiceError::insufficient_stock(
                product_id,
                available.max(0),
                wanted,
            ));
        }
        products.insert(product_id, product);
    }

    let mut priced_lines = Vec::with_capacity(cart.lines.len());
    let mut subtotals = SellerSubtotals::new();
    let mut grand_total = 0i64;
    for line in &cart.lines {
        let product = products.get(&line.product_id).ok_or_else(|| {
            ServiceError::InternalError(format!("product {} was not locked", line.product_id))
        })?;
        let unit_price = pricing::parse_price(product.id, &product.price)?;
        let exact_total = pricing::line_total(unit_price, line.qty)?;
        let rounded_total = pricing::to_whole_amount(exact_total)?;

        subtotals.add(product.user_id, rounded_total)?;
        grand_total = pricing::checked_sum(grand_total, rounded_total)?;
        priced_lines.push((line, product, unit_price, exact_total));
    }

    let purchase = purchase::ActiveModel {
        sender_name: Set(cart.sender.name.clone()),
        sender_contact_type: Set(cart.sender.contact_type.to_string()),
        sender_contact_detail: Set(cart.sender.contact_detail.clone()),
        total: Set(grand_total),
        is_paid: Set(false),
        paid_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let mut categories = catalog::CategoryNames::new();
    let mut purchased_items = Vec::with_capacity(priced_lines.len());
    for (line, product, unit_price, exact_total) in priced_lines {
        purchase_item::ActiveModel {
            purchase_id: Set(purchase.id),
            product_id: Set(product.id),
            seller_id: Set(product.user_id),
            name: Set(product.name.clone()),
            sku: Set(product.sku.clone()),
            category_id: Set(product.category_id),
            file_id: Set(product.file_id),
            unit_price: Set(unit_price.to_string()),
            qty: Set(line.qty),
            line_total: Set(exact_total.to_string()),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        let category = categories
            .name_of(conn, product.category_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "category {} of product {} not found",
                    product.category_id, product.id
                ))
            })?;
        let (file_uri, file_thumbnail_uri) = catalog::media_uris(conn, product.file_id).await?;

        purchased_items.push(PurchasedItemView {
            product_id: product.id.to_string(),
            name: product.name.clone(),
            category,
            qty: line.qty,
            price: pricing::to_whole_amount(unit_price)?,
            sku: product.sku.clone(),
            file_id: product.file_id.map(|id| id.to_string()).unwrap_or_default(),
            file_uri,
            file_thumbnail_uri,
            created_at: product.created_at,
            updated_at: product.updated_at,
        });
    }
    debug!(
        purchase_id = purchase.id,
        categories = categories.lookups(),
        "Purchase lines recorded"
    );

    let mut payment_details = Vec::with_capacity(subtotals.len());
    for (seller_id, subtotal) in subtotals.iter() {
        let bank = seller_accounts::bank_destination(conn, seller_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("seller {} has no account", seller_id))
            })?;
        payment_details.push(SellerPaymentInstruction {
            seller_id: seller_id.to_string(),
            bank_account_name: bank.bank_account_name,
            bank_account_holder: bank.bank_account_holder,
            bank_account_number: bank.bank_account_number,
            total_price: subtotal,
        });
    }

    let receipt = PurchaseReceipt {
        purchase_id: purchase.id.to_string(),
        purchased_items,
        total_price: grand_total,
        payment_details,
    };
    Ok((receipt, purchase.id, subtotals.seller_ids()))
}
