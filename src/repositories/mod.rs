//! Narrow data-access functions used by the purchase services.
//!
//! Everything here is generic over [`sea_orm::ConnectionTrait`] so the
//! services can run it on the open transaction rather than the pool.

pub mod catalog;
pub mod inventory_ledger;
pub mod seller_accounts;
