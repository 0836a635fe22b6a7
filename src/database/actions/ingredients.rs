use std::collections::BTreeSet;

use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::{MAX_LENGTH_INGREDIENT, MAX_LENGTH_MEASUREMENT},
    error::ApiError,
    schema::{Ingredient, IngredientAmount, RecipePart, Uuid},
};

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Sqlite>,
) -> Result<Ingredient, ApiError> {
    let name = name.trim();
    let measurement_unit = measurement_unit.trim();

    if name.is_empty() || name.chars().count() > MAX_LENGTH_INGREDIENT {
        return Err(ApiError::validation(
            "name",
            format!("Ingredient name must be 1 to {MAX_LENGTH_INGREDIENT} characters"),
        ));
    }
    if measurement_unit.is_empty() || measurement_unit.chars().count() > MAX_LENGTH_MEASUREMENT {
        return Err(ApiError::validation(
            "measurement_unit",
            format!("Measurement unit must be 1 to {MAX_LENGTH_MEASUREMENT} characters"),
        ));
    }

    let ingredient: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)
        ON CONFLICT DO NOTHING
        RETURNING *
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await?;

    ingredient.ok_or_else(|| {
        ApiError::validation(
            "name",
            format!("Ingredient {name} ({measurement_unit}) already exists"),
        )
    })
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Sqlite>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn list_ingredients(pool: &Pool<Sqlite>) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Case-insensitive substring search where names starting with the query
/// rank ahead of names that only contain it. Ties are ordered by name.
pub fn prefix_priority_search(ingredients: Vec<Ingredient>, query: &str) -> Vec<Ingredient> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return ingredients;
    }

    let mut matches: Vec<(u8, Ingredient)> = ingredients
        .into_iter()
        .filter_map(|ingredient| {
            let name = ingredient.name.to_lowercase();
            if name.starts_with(&query) {
                Some((1, ingredient))
            } else if name.contains(&query) {
                Some((2, ingredient))
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|(a_priority, a), (b_priority, b)| {
        a_priority
            .cmp(b_priority)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    matches.into_iter().map(|(_, ingredient)| ingredient).collect()
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("%{escaped}%")
}

/// Without a name this is the whole catalogue ordered by name.
///
/// SQLite only folds ASCII case, so `LIKE` narrows the candidates for ASCII
/// queries and anything else is matched in full by [`prefix_priority_search`].
pub async fn search_ingredients(
    name: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Ingredient>, ApiError> {
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return list_ingredients(pool).await;
    };

    let candidates: Vec<Ingredient> = if name.is_ascii() {
        sqlx::query_as("SELECT * FROM ingredients WHERE name LIKE ? ESCAPE '\\' ORDER BY name, id")
            .bind(like_pattern(name))
            .fetch_all(pool)
            .await?
    } else {
        list_ingredients(pool).await?
    };

    Ok(prefix_priority_search(candidates, name))
}

pub async fn list_recipe_parts(
    recipe_id: Uuid,
    pool: &Pool<Sqlite>,
) -> Result<Vec<RecipePart>, ApiError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY i.name, i.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fails with an `ingredients` validation error naming every unknown id.
pub async fn ensure_ingredients_exist(
    ids: &[Uuid],
    conn: &mut SqliteConnection,
) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
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
            "ingredients",
            format!("Unknown ingredient ids: {}", missing.join(", ")),
        ));
    }

    Ok(())
}

/// Replaces the ingredient lines of a recipe. Amounts are checked by the
/// schema, so a bad one aborts the surrounding transaction.
pub async fn set_recipe_ingredients(
    recipe_id: Uuid,
    parts: &[IngredientAmount],
    conn: &mut SqliteConnection,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if parts.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(parts, |mut b, part| {
        b.push_bind(recipe_id).push_bind(part.id).push_bind(part.amount);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}
