pub mod file;
pub mod payment_detail;
pub mod product;
pub mod product_category;
pub mod purchase;
pub mod purchase_item;
pub mod user;
