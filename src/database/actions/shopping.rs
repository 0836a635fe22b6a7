use std::fmt::Write;

use chrono::NaiveDate;
use sqlx::{Pool, Sqlite};

use crate::{
    error::ApiError,
    schema::{ShoppingListLine, ShortRecipe, Uuid},
};

/// Sums the ingredient amounts of every recipe in the user's cart, one line
/// per (name, unit) pair.
pub async fn shopping_list(
    user_id: Uuid,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShoppingListLine>, ApiError> {
    let rows: Vec<ShoppingListLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit,
            SUM(ri.amount) AS total_amount
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn cart_recipes(user_id: Uuid, pool: &Pool<Sqlite>) -> Result<Vec<ShortRecipe>, ApiError> {
    let rows: Vec<ShortRecipe> = sqlx::query_as(
        "
        SELECT r.id, r.name, r.image, r.cooking_time
        FROM shopping_carts sc
        INNER JOIN recipes r ON r.id = sc.recipe_id
        WHERE sc.user_id = ?
        ORDER BY r.name, r.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub fn shopping_list_filename(date: NaiveDate) -> String {
    format!("shopping_list_{}.txt", date.format("%d.%m.%Y"))
}

pub fn render_shopping_list(
    date: NaiveDate,
    lines: &[ShoppingListLine],
    recipes: &[ShortRecipe],
) -> String {
    let mut out = format!("Shopping list for {}\n\n", date.format("%d.%m.%Y"));

    if lines.is_empty() {
        out.push_str("Nothing to buy.\n");
        return out;
    }

    for (n, line) in lines.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{}. {} ({}) - {}",
            n + 1,
            line.name,
            line.measurement_unit,
            line.total_amount
        );
    }

    if !recipes.is_empty() {
        out.push_str("\nRecipes:\n");
        for recipe in recipes {
            let _ = writeln!(out, "- {}", recipe.name);
        }
    }

    out
}
