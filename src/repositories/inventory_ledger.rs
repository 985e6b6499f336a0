//! The only place that reads or writes product stock counters.

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, QueryFilter,
    QuerySelect, RelationTrait,
};

use crate::entities::{product, purchase, purchase_item};

/// Reads a product row holding an exclusive lock until the surrounding
/// transaction ends. On SQLite the lock clause is dropped; the database-level
/// write lock serialises writers there instead.
pub async fn lock_product_for_update<C>(
    conn: &C,
    product_id: i32,
) -> Result<Option<product::Model>, DbErr>
where
    C: ConnectionTrait,
{
    product::Entity::find_by_id(product_id)
        .lock_exclusive()
        .one(conn)
        .await
}

/// Quantity of `product_id` committed to purchases that are not paid yet.
pub async fn outstanding_holds<C>(conn: &C, product_id: i32) -> Result<i64, DbErr>
where
    C: ConnectionTrait,
{
    let held = purchase_item::Entity::find()
        .select_only()
        .column_as(
            Expr::col((purchase_item::Entity, purchase_item::Column::Qty)).sum(),
            "held",
        )
        .join(JoinType::InnerJoin, purchase_item::Relation::Purchase.def())
        .filter(purchase::Column::IsPaid.eq(false))
        .filter(purchase_item::Column::ProductId.eq(product_id))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await?;

    Ok(held.flatten().unwrap_or(0))
}

/// Unconditional `qty = qty - amount`. Callers validate under the row lock
/// first.
pub async fn decrement_quantity<C>(conn: &C, product_id: i32, amount: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Qty,
            Expr::col(product::Column::Qty).sub(amount),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(DbErr::RecordNotUpdated);
    }
    Ok(())
}

/// Order in which product rows must be locked: ascending, without repeats.
/// Every transaction that locks several products uses this order, so two of
/// them can never wait on each other in a cycle.
pub fn lock_order<I>(product_ids: I) -> Vec<i32>
where
    I: IntoIterator<Item = i32>,
{
    product_ids
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![7], vec![7])]
    #[case(vec![9, 3, 9, 1], vec![1, 3, 9])]
    #[case(vec![5, 4, 3, 2, 1], vec![1, 2, 3, 4, 5])]
    fn lock_order_is_sorted_and_deduplicated(#[case] input: Vec<i32>, #[case] expected: Vec<i32>) {
        assert_eq!(lock_order(input), expected);
    }
}
