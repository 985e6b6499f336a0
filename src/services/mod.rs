// Purchase lifecycle
pub mod cart_validator;
pub mod payment_confirmation;
pub mod purchases;

// Money and per-seller attribution
pub mod pricing;
pub mod seller_payouts;
