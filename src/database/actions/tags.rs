use std::collections::BTreeSet;

use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::{MAX_LENGTH_TAG_NAME, MAX_LENGTH_TAG_SLUG},
    error::ApiError,
    schema::{Tag, Uuid},
};

pub async fn create_tag(name: &str, slug: &str, pool: &Pool<Sqlite>) -> Result<Tag, ApiError> {
    let name = name.trim();
    let slug = slug.trim();

    if name.is_empty() || name.chars().count() > MAX_LENGTH_TAG_NAME {
        return Err(ApiError::validation(
            "name",
            format!("Tag name must be 1 to {MAX_LENGTH_TAG_NAME} characters"),
        ));
    }
    if slug.is_empty() || slug.chars().count() > MAX_LENGTH_TAG_SLUG {
        return Err(ApiError::validation(
            "slug",
            format!("Tag slug must be 1 to {MAX_LENGTH_TAG_SLUG} characters"),
        ));
    }

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, slug) VALUES (?, ?) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(name)
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    tag.ok_or_else(|| ApiError::validation("slug", format!("Tag with slug {slug} already exists")))
}

pub async fn get_tag(id: Uuid, pool: &Pool<Sqlite>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Sqlite>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_recipe_tags(recipe_id: Uuid, pool: &Pool<Sqlite>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ?
        ORDER BY t.name, t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Fails with a `tags` validation error naming every id that has no tag.
pub async fn ensure_tags_exist(ids: &[Uuid], conn: &mut SqliteConnection) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: Vec<(Uuid,)> = query.build_query_as().fetch_all(&mut *conn).await?;
    let found: BTreeSet<Uuid> = found.into_iter().map(|row| row.0).collect();

    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ApiError::validation(
            "tags",
            format!("Unknown tag ids: {}", missing.join(", ")),
        ));
    }

    Ok(())
}

/// Replaces the tag set of a recipe.
pub async fn set_recipe_tags(
    recipe_id: Uuid,
    tags: &[Uuid],
    conn: &mut SqliteConnection,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(tags, |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}
