//! Read-only lookups against catalog collaborators: category names and the
//! file store.

use std::collections::HashMap;

use sea_orm::{ConnectionTrait, DbErr, EntityTrait};
use tracing::debug;

use crate::entities::{file, product_category};

/// Category-name lookups memoised for the lifetime of one request.
#[derive(Debug, Default)]
pub struct CategoryNames {
    cache: HashMap<i32, Option<String>>,
}

impl CategoryNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of `category_id`, or `None` when the category does not exist.
    pub async fn name_of<C>(&mut self, conn: &C, category_id: i32) -> Result<Option<String>, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(cached) = self.cache.get(&category_id) {
            return Ok(cached.clone());
        }

        let name = product_category::Entity::find_by_id(category_id)
            .one(conn)
            .await?
            .map(|category| category.name);
        debug!(category_id, found = name.is_some(), "Resolved category name");
        self.cache.insert(category_id, name.clone());
        Ok(name)
    }

    pub fn lookups(&self) -> usize {
        self.cache.len()
    }
}

pub async fn find_file<C>(conn: &C, file_id: i32) -> Result<Option<file::Model>, DbErr>
where
    C: ConnectionTrait,
{
    file::Entity::find_by_id(file_id).one(conn).await
}

/// Media URIs for an optional file reference. A product without media, or
/// one whose media has been removed, resolves to empty strings.
pub async fn media_uris<C>(conn: &C, file_id: Option<i32>) -> Result<(String, String), DbErr>
where
    C: ConnectionTrait,
{
    let Some(file_id) = file_id else {
        return Ok((String::new(), String::new()));
    };

    Ok(find_file(conn, file_id)
        .await?
        .map(|f| (f.file_uri, f.file_thumbnail_uri))
        .unwrap_or_default())
}
