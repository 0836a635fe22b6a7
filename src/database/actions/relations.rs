use sqlx::{Pool, Sqlite};

use crate::{
    error::ApiError,
    schema::{RelationKind, ShortRecipe, Uuid},
};

use super::recipes::require_recipe;

pub async fn is_in_relation(
    kind: RelationKind,
    recipe_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Sqlite>,
) -> Result<bool, ApiError> {
    let Some(user_id) = viewer else {
        return Ok(false);
    };

    let row: Option<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE user_id = ? AND recipe_id = ?",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Marks a recipe as a favorite or puts it in the cart. The unique index on
/// (user_id, recipe_id) decides whether this is a duplicate.
pub async fn add_relation(
    kind: RelationKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Sqlite>,
) -> Result<ShortRecipe, ApiError> {
    let recipe = require_recipe(recipe_id, pool).await?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::DuplicateRelation(format!(
            "Recipe with id {recipe_id} already in {}",
            kind.verbose_name()
        )));
    }

    Ok(ShortRecipe::from(&recipe))
}

pub async fn remove_relation(
    kind: RelationKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(format!(
            "Recipe with id {recipe_id} is not in {}",
            kind.verbose_name()
        )));
    }

    Ok(())
}
