use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionKeys},
    },
    error::ApiError,
    pagination::{PageContext, PageRequest},
    schema::{RegisterUser, SetPassword, User, UserView, Uuid},
};

use super::follows::is_subscribed;

pub async fn get_user(pool: &Pool<Sqlite>, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_email(pool: &Pool<Sqlite>, email: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER(?)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn require_user(pool: &Pool<Sqlite>, user_id: Uuid) -> Result<User, ApiError> {
    get_user(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No user exists with id {user_id}")))
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(input: RegisterUser, pool: &Pool<Sqlite>) -> Result<User, ApiError> {
    input.validate()?;

    if get_user_by_email(pool, &input.email).await?.is_some() {
        return Err(ApiError::validation(
            "email",
            "A user with that email already exists",
        ));
    }

    let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(&input.username)
        .fetch_optional(pool)
        .await?;
    if taken.is_some() {
        return Err(ApiError::validation(
            "username",
            "A user with that username already exists",
        ));
    }

    let password = hash_password(&input.password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
    ",
    )
    .bind(&input.email)
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(password)
    .fetch_one(pool)
    .await?;

    log::info!("Registered user {} ({})", user.username, user.id);

    Ok(user)
}

pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Sqlite>,
) -> Result<String, ApiError> {
    let Some(user) = get_user_by_email(pool, email).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &user.password)? {
        log::debug!("Failed login for {}", user.username);
        return Err(ApiError::InvalidCredentials);
    }

    generate_jwt_session(&user, keys)
}

pub async fn set_password(
    user_id: Uuid,
    input: SetPassword,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    input.validate()?;

    let user = require_user(pool, user_id).await?;
    if !verify_password(&input.current_password, &user.password)? {
        return Err(ApiError::validation(
            "current_password",
            "Current password is incorrect",
        ));
    }

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hash_password(&input.new_password)?)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_avatar(
    user_id: Uuid,
    avatar: Option<String>,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let result = sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
        .bind(avatar)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(format!("No user exists with id {user_id}")));
    }

    Ok(())
}

pub async fn user_view(
    user: &User,
    viewer: Option<Uuid>,
    pool: &Pool<Sqlite>,
) -> Result<UserView, ApiError> {
    let subscribed = is_subscribed(viewer, user.id, pool).await?;

    Ok(UserView::from_user(user, subscribed))
}

pub async fn fetch_users(
    viewer: Option<Uuid>,
    request: PageRequest,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<UserView>, ApiError> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY username LIMIT ? OFFSET ?")
        .bind(request.page_size)
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for user in &rows {
        views.push(user_view(user, viewer, pool).await?);
    }

    Ok(PageContext::from_rows(views, total.0, request))
}
