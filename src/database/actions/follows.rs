use sqlx::{Pool, Sqlite};

use crate::{
    error::ApiError,
    pagination::{PageContext, PageRequest},
    schema::{SubscriptionView, User, UserView, Uuid},
};

use super::{
    recipes::{count_author_recipes, list_author_recipes},
    users::require_user,
};

/// Whether `viewer` follows `author_id`. Anonymous viewers follow nobody.
pub async fn is_subscribed(
    viewer: Option<Uuid>,
    author_id: Uuid,
    pool: &Pool<Sqlite>,
) -> Result<bool, ApiError> {
    let Some(follower_id) = viewer else {
        return Ok(false);
    };

    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM follows WHERE follower_id = ? AND author_id = ?")
            .bind(follower_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn follow(
    follower_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Sqlite>,
) -> Result<User, ApiError> {
    if follower_id == author_id {
        return Err(ApiError::SelfFollow);
    }

    let author = require_user(pool, author_id).await?;

    let result = sqlx::query(
        "INSERT INTO follows (follower_id, author_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(follower_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::DuplicateRelation(format!(
            "Subscription to {} already exists",
            author.username
        )));
    }

    log::debug!("User {follower_id} subscribed to {author_id}");

    Ok(author)
}

pub async fn unfollow(
    follower_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND author_id = ?")
        .bind(follower_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(format!(
            "You are not subscribed to user {author_id}"
        )));
    }

    Ok(())
}

/// A followed author with a capped list of their newest recipes.
pub async fn subscription_view(
    author: &User,
    viewer: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Sqlite>,
) -> Result<SubscriptionView, ApiError> {
    let is_subscribed = is_subscribed(Some(viewer), author.id, pool).await?;

    Ok(SubscriptionView {
        author: UserView::from_user(author, is_subscribed),
        recipes: list_author_recipes(author.id, recipes_limit, pool).await?,
        recipes_count: count_author_recipes(author.id, pool).await?,
    })
}

pub async fn fetch_subscriptions(
    follower_id: Uuid,
    recipes_limit: Option<i64>,
    request: PageRequest,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<SubscriptionView>, ApiError> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
        .bind(follower_id)
        .fetch_one(pool)
        .await?;

    let authors: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.follower_id = ?
        ORDER BY u.username
        LIMIT ? OFFSET ?
    ",
    )
    .bind(follower_id)
    .bind(request.page_size)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    let mut views = Vec::with_capacity(authors.len());
    for author in &authors {
        views.push(subscription_view(author, follower_id, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(views, total.0, request))
}
