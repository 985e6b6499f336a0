use sea_orm::{ConnectionTrait, DbErr, EntityTrait};
use serde::Serialize;

use crate::entities::user;

/// Where a buyer sends money for one seller's share of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankDestination {
    pub bank_account_name: String,
    pub bank_account_holder: String,
    pub bank_account_number: String,
}

impl From<user::Model> for BankDestination {
    fn from(model: user::Model) -> Self {
        Self {
            bank_account_name: model.bank_account_name,
            bank_account_holder: model.bank_account_holder,
            bank_account_number: model.bank_account_number,
        }
    }
}

pub async fn bank_destination<C>(conn: &C, seller_id: i32) -> Result<Option<BankDestination>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(user::Entity::find_by_id(seller_id)
        .one(conn)
        .await?
        .map(BankDestination::from))
}
