use super::common::{created_response, json_body};
use crate::{
    errors::ServiceError,
    services::{
        cart_validator::{parse_identity, CartInput, CartLineInput},
        seller_payouts::{ProofSubmission, SellerProof},
    },
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use validator::Validate;

/// One line of the buyer's cart
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PurchasedItemRequest {
    #[schema(example = "7")]
    pub product_id: String,
    #[validate(range(min = 1, message = "qty must be greater than 0"))]
    #[schema(example = 2)]
    pub qty: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePurchaseRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub purchased_items: Vec<PurchasedItemRequest>,
    #[validate(length(min = 4, max = 55))]
    #[schema(example = "Budi Santoso")]
    pub sender_name: String,
    /// "email" or "phone"
    #[schema(example = "phone")]
    pub sender_contact_type: String,
    #[schema(example = "+6281234567890")]
    pub sender_contact_detail: String,
}

impl From<CreatePurchaseRequest> for CartInput {
    fn from(request: CreatePurchaseRequest) -> Self {
        CartInput {
            lines: request
                .purchased_items
                .into_iter()
                .map(|item| CartLineInput {
                    product_id: item.product_id,
                    qty: item.qty,
                })
                .collect(),
            sender_name: request.sender_name,
            sender_contact_type: request.sender_contact_type,
            sender_contact_detail: request.sender_contact_detail,
        }
    }
}

/// Proofs of payment. Send either `fileIds`, paired with sellers in the
/// order of `paymentDetails` from the purchase response, or `proofs`
/// naming the seller each file pays.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfirmPaymentRequest {
    pub file_ids: Option<Vec<String>>,
    pub proofs: Option<Vec<SellerProof>>,
}

impl TryFrom<ConfirmPaymentRequest> for ProofSubmission {
    type Error = ServiceError;

    fn try_from(request: ConfirmPaymentRequest) -> Result<Self, Self::Error> {
        let submission = match (request.file_ids, request.proofs) {
            (Some(file_ids), None) => ProofSubmission::positional(&file_ids)?,
            (None, Some(proofs)) => ProofSubmission::per_seller(&proofs)?,
            (Some(_), Some(_)) => {
                return Err(ServiceError::ValidationError(
                    "send either fileIds or proofs, not both".into(),
                ))
            }
            (None, None) => {
                return Err(ServiceError::ValidationError("fileIds is required".into()))
            }
        };
        if submission.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one proof of payment is required".into(),
            ));
        }
        Ok(submission)
    }
}

/// Create a purchase and hold stock for it
#[utoipa::path(
    post,
    path = "/purchase",
    summary = "Create purchase",
    description = "Validates the cart, holds the requested stock and returns per-seller payment instructions",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase created", body = crate::services::purchases::PurchaseReceipt,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid cart, unknown product or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "purchases"
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    payload: Result<Json<CreatePurchaseRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = json_body(payload)?;
    request.validate()?;
    for item in &request.purchased_items {
        item.validate()?;
    }

    let receipt = state.services.purchases.submit(request.into()).await?;
    Ok(created_response(receipt))
}

/// Confirm payment of a purchase
#[utoipa::path(
    post,
    path = "/purchase/{purchase_id}",
    summary = "Confirm payment",
    description = "Attaches one proof of payment per seller, consumes the held stock and marks the purchase paid",
    params(("purchase_id" = String, Path, description = "Purchase id")),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 201, description = "Payment confirmed", body = crate::services::payment_confirmation::PaymentConfirmation,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Unknown or already paid purchase, proof count mismatch or unknown file", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "purchases"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(raw_purchase_id): Path<String>,
    payload: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let purchase_id = parse_identity(raw_purchase_id.trim()).ok_or_else(|| {
        ServiceError::ValidationError(format!("invalid purchase id '{}'", raw_purchase_id))
    })?;
    let proofs = ProofSubmission::try_from(json_body(payload)?)?;
    debug!(purchase_id, proofs = proofs.len(), "Confirming payment");

    let confirmation = state
        .services
        .payments
        .confirm_payment(purchase_id, proofs)
        .await?;
    Ok(created_response(confirmation))
}

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchase", post(create_purchase))
        .route("/purchase/:purchase_id", post(confirm_payment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn create_request_uses_camel_case_and_rejects_unknown_fields() {
        let parsed: CreatePurchaseRequest = serde_json::from_value(serde_json::json!({
            "purchasedItems": [{"productId": "7", "qty": 2}],
            "senderName": "Budi Santoso",
            "senderContactType": "email",
            "senderContactDetail": "budi@mail.id"
        }))
        .unwrap();
        assert_eq!(parsed.purchased_items[0].product_id, "7");

        let unknown = serde_json::from_value::<CreatePurchaseRequest>(serde_json::json!({
            "purchasedItems": [],
            "senderName": "Budi Santoso",
            "senderContactType": "email",
            "senderContactDetail": "budi@mail.id",
            "coupon": "FREE"
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn confirm_request_requires_exactly_one_proof_form() {
        let both = ConfirmPaymentRequest {
            file_ids: Some(vec!["1".into()]),
            proofs: Some(vec![]),
        };
        assert_matches!(
            ProofSubmission::try_from(both),
            Err(ServiceError::ValidationError(_))
        );

        let neither = ConfirmPaymentRequest {
            file_ids: None,
            proofs: None,
        };
        assert_matches!(
            ProofSubmission::try_from(neither),
            Err(ServiceError::ValidationError(_))
        );

        let empty = ConfirmPaymentRequest {
            file_ids: Some(vec![]),
            proofs: None,
        };
        assert_matches!(
            ProofSubmission::try_from(empty),
            Err(ServiceError::ValidationError(_))
        );

        let positional = ConfirmPaymentRequest {
            file_ids: Some(vec!["101".into()]),
            proofs: None,
        };
        assert_eq!(
            ProofSubmission::try_from(positional).unwrap(),
            ProofSubmission::Positional(vec![101])
        );
    }

    #[test]
    fn malformed_ids_are_rejected_before_reaching_the_service() {
        let bad_file = ConfirmPaymentRequest {
            file_ids: Some(vec!["abc".into()]),
            proofs: None,
        };
        assert_matches!(
            ProofSubmission::try_from(bad_file),
            Err(ServiceError::ValidationError(ref msg)) if msg.contains("file id 'abc'")
        );

        let bad_seller = ConfirmPaymentRequest {
            file_ids: None,
            proofs: Some(vec![SellerProof {
                seller_id: "-4".into(),
                file_id: "12".into(),
            }]),
        };
        assert_matches!(
            ProofSubmission::try_from(bad_seller),
            Err(ServiceError::ValidationError(ref msg)) if msg.contains("seller id '-4'")
        );
    }
}
