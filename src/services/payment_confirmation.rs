use crate::{
    db::{DbPool, TrackedTransaction},
    entities::{payment_detail, purchase, purchase_item},
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::{catalog, inventory_ledger},
    services::seller_payouts::{attribute_proofs, AttributedProof, ProofSubmission},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tracing::{info, instrument};
use utoipa::ToSchema;

pub const CONFIRMATION_MESSAGE: &str = "Payment confirmed successfully";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedProof {
    pub seller_id: String,
    pub file_id: String,
}

impl From<AttributedProof> for ConfirmedProof {
    fn from(proof: AttributedProof) -> Self {
        Self {
            seller_id: proof.seller_id.to_string(),
            file_id: proof.file_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    #[schema(example = "Payment confirmed successfully")]
    pub message: String,
    pub purchase_id: String,
    pub payment_details: Vec<ConfirmedProof>,
}

/// Moves a purchase from unpaid to paid: records one proof per seller,
/// consumes the stock and sets the paid flag in a single transaction.
#[derive(Clone)]
pub struct PaymentConfirmationService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    lock_timeout: Option<Duration>,
}

impl PaymentConfirmationService {
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

    #[instrument(skip(self, proofs), fields(proofs = proofs.len()))]
    pub async fn confirm_payment(
        &self,
        purchase_id: i32,
        proofs: ProofSubmission,
    ) -> Result<PaymentConfirmation, ServiceError> {
        let txn =
            TrackedTransaction::begin(&self.db_pool, "confirm_payment", self.lock_timeout).await?;
        let outcome = settle_purchase(txn.conn(), purchase_id, &proofs).await;
        let attributed = txn.settle(outcome).await.map_err(|e| {
            counter!("tutuplapak.payments.rejected", 1, "reason" => e.code());
            e
        })?;

        counter!("tutuplapak.payments.confirmed", 1);
        info!(purchase_id, sellers = attributed.len(), "Payment confirmed");

        if let Some(event_sender) = &self.event_sender {
            event_sender
                .send_or_log(Event::PaymentConfirmed {
                    purchase_id,
                    proof_count: attributed.len(),
                    timestamp: Utc::now(),
                })
                .await;
        }

        Ok(PaymentConfirmation {
            message: CONFIRMATION_MESSAGE.to_string(),
            purchase_id: purchase_id.to_string(),
            payment_details: attributed.into_iter().map(ConfirmedProof::from).collect(),
        })
    }
}

async fn settle_purchase<C>(
    conn: &C,
    purchase_id: i32,
    proofs: &ProofSubmission,
) -> Result<Vec<AttributedProof>, ServiceError>
where
    C: ConnectionTrait,
{
    // Locking the header first serialises concurrent confirmations.
    let purchase = purchase::Entity::find_by_id(purchase_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("purchase {} not found", purchase_id)))?;
    if purchase.is_paid {
        return Err(ServiceError::Conflict(format!(
            "purchase {} is already paid",
            purchase_id
        )));
    }

    let items = purchase_item::Entity::find()
        .filter(purchase_item::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(purchase_item::Column::Id)
        .all(conn)
        .await?;

    let mut items_by_seller: BTreeMap<i32, Vec<&purchase_item::Model>> = BTreeMap::new();
    for item in &items {
        items_by_seller.entry(item.seller_id).or_default().push(item);
    }
    let sellers: Vec<i32> = items_by_seller.keys().copied().collect();

    let attributed = attribute_proofs(&sellers, proofs)?;

    // Every reference must resolve before anything is written.
    for proof in &attributed {
        if catalog::find_file(conn, proof.file_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "proof file {} not found",
                proof.file_id
            )));
        }
    }

    let mut purchased: BTreeMap<i32, i64> = BTreeMap::new();
    for item in &items {
        *purchased.entry(item.product_id).or_insert(0) += i64::from(item.qty);
    }
    for product_id in inventory_ledger::lock_order(purchased.keys().copied()) {
        let product = inventory_ledger::lock_product_for_update(conn, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))?;
        let wanted = purchased.get(&product_id).copied().unwrap_or_default();
        if i64::from(product.qty) < wanted {
            return Err(ServiceError::insufficient_stock(
                product_id,
                i64::from(product.qty),
                wanted,
            ));
        }
    }

    for proof in &attributed {
        payment_detail::ActiveModel {
            purchase_id: Set(purchase_id),
            seller_id: Set(proof.seller_id),
            file_id: Set(proof.file_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        for item in items_by_seller.get(&proof.seller_id).into_iter().flatten() {
            inventory_ledger::decrement_quantity(conn, item.product_id, item.qty).await?;
        }
    }

    let mut paid: purchase::ActiveModel = purchase.into();
    paid.is_paid = Set(true);
    paid.paid_at = Set(Some(Utc::now()));
    paid.update(conn).await?;

    Ok(attributed)
}
