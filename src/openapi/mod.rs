use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tutuplapak Purchase API",
        version = "0.1.0",
        description = r#"
# Purchase lifecycle

Buyers submit a cart, receive one payment instruction per seller, pay each
seller by bank transfer and then upload one proof of payment per seller.

## Stock

Creating a purchase holds the requested quantity until the purchase is paid.
Confirming payment consumes the held stock.

## Errors

Caller errors (validation, unknown product or purchase, insufficient stock,
already paid, proof count mismatch) return `400`. Persistence failures return
`500`. Every error body carries `code`, `message` and the request id.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "purchases", description = "Purchase creation and payment confirmation")
    ),
    paths(
        crate::handlers::purchases::create_purchase,
        crate::handlers::purchases::confirm_payment,
    ),
    components(
        schemas(
            crate::handlers::purchases::CreatePurchaseRequest,
            crate::handlers::purchases::PurchasedItemRequest,
            crate::handlers::purchases::ConfirmPaymentRequest,
            crate::services::seller_payouts::SellerProof,
            crate::services::cart_validator::ContactType,
            crate::services::purchases::PurchaseReceipt,
            crate::services::purchases::PurchasedItemView,
            crate::services::purchases::SellerPaymentInstruction,
            crate::services::payment_confirmation::PaymentConfirmation,
            crate::services::payment_confirmation::ConfirmedProof,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_purchase_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Tutuplapak Purchase API"));
        assert!(json.contains("/purchase/{purchase_id}"));
        assert!(json.contains("PurchaseReceipt"));
    }
}
