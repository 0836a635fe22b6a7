use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite};

use crate::{
    authentication::permissions::ActionType,
    constants::{
        MAX_AMOUNT, MAX_COOKING_TIME, MAX_LENGTH_RECIPE_NAME, MIN_AMOUNT, MIN_COOKING_TIME,
    },
    error::ApiError,
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{
        Recipe, RecipeFilter, RecipeView, RecipeWrite, RelationKind, ShortRecipe, ValidRecipe,
        Uuid,
    },
};

use super::{
    ingredients::{ensure_ingredients_exist, list_recipe_parts, set_recipe_ingredients},
    relations::is_in_relation,
    tags::{ensure_tags_exist, list_recipe_tags, set_recipe_tags},
    users::{require_user, user_view},
};

/// Returns the values that occur more than once, in order of first repeat.
fn duplicates(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    let mut repeated = Vec::new();

    for id in ids {
        if !seen.insert(id) && !repeated.contains(&id) {
            repeated.push(id);
        }
    }

    repeated
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

/// Checks a recipe write body. `image` is only required when `creating`.
pub fn validate_recipe(input: RecipeWrite, creating: bool) -> Result<ValidRecipe, ApiError> {
    let tags = input
        .tags
        .ok_or_else(|| ApiError::validation("tags", "This field is required"))?;
    if tags.is_empty() {
        return Err(ApiError::validation("tags", "At least one tag is required"));
    }
    let repeated = duplicates(tags.iter().copied());
    if !repeated.is_empty() {
        return Err(ApiError::validation(
            "tags",
            format!("Duplicates in request: {}", join_ids(&repeated)),
        ));
    }

    let ingredients = input
        .ingredients
        .ok_or_else(|| ApiError::validation("ingredients", "This field is required"))?;
    if ingredients.is_empty() {
        return Err(ApiError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }
    let repeated = duplicates(ingredients.iter().map(|part| part.id));
    if !repeated.is_empty() {
        return Err(ApiError::validation(
            "ingredients",
            format!("Duplicates in request: {}", join_ids(&repeated)),
        ));
    }
    if let Some(part) = ingredients
        .iter()
        .find(|part| !(MIN_AMOUNT..=MAX_AMOUNT).contains(&part.amount))
    {
        return Err(ApiError::validation(
            "ingredients",
            format!(
                "Amount of ingredient {} must be between {MIN_AMOUNT} and {MAX_AMOUNT}",
                part.id
            ),
        ));
    }

    let name = input.name.unwrap_or_default().trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_LENGTH_RECIPE_NAME {
        return Err(ApiError::validation(
            "name",
            format!("Recipe name must be 1 to {MAX_LENGTH_RECIPE_NAME} characters"),
        ));
    }

    let text = input.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::validation("text", "This field may not be blank"));
    }

    let cooking_time = input
        .cooking_time
        .ok_or_else(|| ApiError::validation("cooking_time", "This field is required"))?;
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&cooking_time) {
        return Err(ApiError::validation(
            "cooking_time",
            format!("Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"),
        ));
    }

    let image = input.image.filter(|image| !image.trim().is_empty());
    if creating && image.is_none() {
        return Err(ApiError::validation("image", "An image is required"));
    }

    Ok(ValidRecipe {
        tags,
        ingredients,
        name,
        text,
        cooking_time,
        image,
    })
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Sqlite>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn require_recipe(id: Uuid, pool: &Pool<Sqlite>) -> Result<Recipe, ApiError> {
    get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No recipe exists with id {id}")))
}

/// Loads a recipe the caller is allowed to modify.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = require_recipe(id, pool).await?;

    if !session.can_manage(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    ) {
        return Err(ApiError::Forbidden);
    }

    Ok(recipe)
}

pub async fn create_recipe(
    session: &SessionData,
    input: RecipeWrite,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = validate_recipe(input, true)?;
    let image = recipe
        .image
        .ok_or_else(|| ApiError::validation("image", "An image is required"))?;

    let mut tx = pool.begin().await?;

    ensure_tags_exist(&recipe.tags, &mut tx).await?;
    ensure_ingredients_exist(
        &recipe.ingredients.iter().map(|part| part.id).collect::<Vec<Uuid>>(),
        &mut tx,
    )
    .await?;

    let row: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
    ",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(image)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    set_recipe_tags(row.id, &recipe.tags, &mut tx).await?;
    set_recipe_ingredients(row.id, &recipe.ingredients, &mut tx).await?;

    tx.commit().await?;

    log::info!("User {} created recipe {}", session.user_id, row.id);

    Ok(row)
}

/// Fields left out of a PATCH body keep their stored values, except for the
/// tag and ingredient lists which must always be sent.
pub async fn update_recipe(
    id: Uuid,
    session: &SessionData,
    input: RecipeWrite,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    let stored = get_recipe_mut(id, session, pool).await?;

    let input = RecipeWrite {
        name: input.name.or(Some(stored.name)),
        text: input.text.or(Some(stored.text)),
        cooking_time: input.cooking_time.or(Some(stored.cooking_time)),
        ..input
    };
    let recipe = validate_recipe(input, false)?;
    let image = recipe.image.unwrap_or(stored.image);

    let mut tx = pool.begin().await?;

    ensure_tags_exist(&recipe.tags, &mut tx).await?;
    ensure_ingredients_exist(
        &recipe.ingredients.iter().map(|part| part.id).collect::<Vec<Uuid>>(),
        &mut tx,
    )
    .await?;

    let row: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET name = ?, text = ?, cooking_time = ?, image = ?
        WHERE id = ?
        RETURNING *
    ",
    )
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(image)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    set_recipe_tags(id, &recipe.tags, &mut tx).await?;
    set_recipe_ingredients(id, &recipe.ingredients, &mut tx).await?;

    tx.commit().await?;

    Ok(row)
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    log::info!("User {} deleted recipe {id}", session.user_id);

    Ok(())
}

pub async fn recipe_view(
    recipe: &Recipe,
    viewer: Option<Uuid>,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, ApiError> {
    let author = require_user(pool, recipe.author_id).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags: list_recipe_tags(recipe.id, pool).await?,
        author: user_view(&author, viewer, pool).await?,
        ingredients: list_recipe_parts(recipe.id, pool).await?,
        is_favorited: is_in_relation(RelationKind::Favorite, recipe.id, viewer, pool).await?,
        is_in_shopping_cart: is_in_relation(RelationKind::ShoppingCart, recipe.id, viewer, pool)
            .await?,
        name: recipe.name.to_owned(),
        image: recipe.image.to_owned(),
        text: recipe.text.to_owned(),
        cooking_time: recipe.cooking_time,
    })
}

/// Appends the WHERE clause shared by the listing and its count. Relation
/// filters only apply when there is a viewer to relate to.
fn push_recipe_filters(
    query: &mut QueryBuilder<'_, Sqlite>,
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
) {
    query.push(" WHERE 1 = 1");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = query.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.to_owned());
        }
        separated.push_unseparated("))");
    }

    if let Some(viewer) = viewer {
        for (flag, kind) in [
            (filter.is_favorited, RelationKind::Favorite),
            (filter.is_in_shopping_cart, RelationKind::ShoppingCart),
        ] {
            let Some(wanted) = flag else {
                continue;
            };

            query
                .push(if wanted { " AND EXISTS" } else { " AND NOT EXISTS" })
                .push(format!(
                    " (SELECT 1 FROM {} x WHERE x.recipe_id = r.id AND x.user_id = ",
                    kind.table()
                ))
                .push_bind(viewer)
                .push(")");
        }
    }
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    request: PageRequest,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<RecipeView>, ApiError> {
    let mut count_query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_recipe_filters(&mut count_query, filter, viewer);
    let total: (i64,) = count_query.build_query_as().fetch_one(pool).await?;

    if total.0 == 0 {
        return Ok(PageContext::no_rows());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT r.* FROM recipes r");
    push_recipe_filters(&mut query, filter, viewer);
    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(request.page_size)
        .push(" OFFSET ")
        .push_bind(request.offset());

    let rows: Vec<Recipe> = query.build_query_as().fetch_all(pool).await?;

    let mut views = Vec::with_capacity(rows.len());
    for recipe in &rows {
        views.push(recipe_view(recipe, viewer, pool).await?);
    }

    Ok(PageContext::from_rows(views, total.0, request))
}

/// Newest recipes of an author, capped at `limit` when given.
pub async fn list_author_recipes(
    author_id: Uuid,
    limit: Option<i64>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShortRecipe>, ApiError> {
    // SQLite treats a negative LIMIT as no limit at all.
    let limit = limit.filter(|limit| *limit >= 0).unwrap_or(-1);

    let rows: Vec<ShortRecipe> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ?
        ORDER BY pub_date DESC, id DESC
        LIMIT ?
    ",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_author_recipes(author_id: Uuid, pool: &Pool<Sqlite>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IngredientAmount;

    fn write() -> RecipeWrite {
        RecipeWrite {
            tags: Some(vec![1, 2]),
            ingredients: Some(vec![
                IngredientAmount { id: 10, amount: 5 },
                IngredientAmount { id: 11, amount: 1 },
            ]),
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(20),
            image: Some(String::from("data:image/png;base64,AAAA")),
        }
    }

    fn field_of(error: ApiError) -> String {
        match error {
            ApiError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_complete_body() {
        let recipe = validate_recipe(write(), true).unwrap();
        assert_eq!(recipe.tags, vec![1, 2]);
        assert_eq!(recipe.name, "Pancakes");
        assert!(recipe.image.is_some());
    }

    #[test]
    fn rejects_empty_lists() {
        let input = RecipeWrite {
            tags: Some(vec![]),
            ..write()
        };
        assert_eq!(field_of(validate_recipe(input, true).unwrap_err()), "tags");

        let input = RecipeWrite {
            ingredients: Some(vec![]),
            ..write()
        };
        assert_eq!(
            field_of(validate_recipe(input, true).unwrap_err()),
            "ingredients"
        );
    }

    #[test]
    fn duplicates_are_named() {
        let input = RecipeWrite {
            ingredients: Some(vec![
                IngredientAmount { id: 10, amount: 5 },
                IngredientAmount { id: 10, amount: 3 },
            ]),
            ..write()
        };

        match validate_recipe(input, true).unwrap_err() {
            ApiError::Validation { field, message } => {
                assert_eq!(field, "ingredients");
                assert_eq!(message, "Duplicates in request: 10");
            }
            other => panic!("unexpected {other:?}"),
        }

        let input = RecipeWrite {
            tags: Some(vec![3, 4, 3, 4, 3]),
            ..write()
        };
        match validate_recipe(input, true).unwrap_err() {
            ApiError::Validation { message, .. } => {
                assert_eq!(message, "Duplicates in request: 3, 4")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn enforces_minimums() {
        let input = RecipeWrite {
            ingredients: Some(vec![IngredientAmount { id: 10, amount: 0 }]),
            ..write()
        };
        assert_eq!(
            field_of(validate_recipe(input, true).unwrap_err()),
            "ingredients"
        );

        let input = RecipeWrite {
            cooking_time: Some(0),
            ..write()
        };
        assert_eq!(
            field_of(validate_recipe(input, true).unwrap_err()),
            "cooking_time"
        );
    }

    #[test]
    fn enforces_maximums() {
        let input = RecipeWrite {
            ingredients: Some(vec![IngredientAmount {
                id: 10,
                amount: MAX_AMOUNT + 1,
            }]),
            ..write()
        };
        assert_eq!(
            field_of(validate_recipe(input, true).unwrap_err()),
            "ingredients"
        );

        let input = RecipeWrite {
            cooking_time: Some(MAX_COOKING_TIME + 1),
            ..write()
        };
        assert_eq!(
            field_of(validate_recipe(input, true).unwrap_err()),
            "cooking_time"
        );

        let input = RecipeWrite {
            ingredients: Some(vec![IngredientAmount {
                id: 10,
                amount: MAX_AMOUNT,
            }]),
            cooking_time: Some(MAX_COOKING_TIME),
            ..write()
        };
        assert!(validate_recipe(input, true).is_ok());
    }

    #[test]
    fn image_only_required_on_create() {
        let input = RecipeWrite {
            image: None,
            ..write()
        };
        assert_eq!(
            field_of(validate_recipe(input.clone(), true).unwrap_err()),
            "image"
        );
        assert!(validate_recipe(input, false).unwrap().image.is_none());
    }

    #[test]
    fn blank_name_and_text() {
        let input = RecipeWrite {
            name: Some(String::from("   ")),
            ..write()
        };
        assert_eq!(field_of(validate_recipe(input, true).unwrap_err()), "name");

        let input = RecipeWrite {
            text: None,
            ..write()
        };
        assert_eq!(field_of(validate_recipe(input, true).unwrap_err()), "text");
    }
}
