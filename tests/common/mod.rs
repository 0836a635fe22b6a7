#![allow(dead_code)]

use foodgram::{
    actions::{create_ingredient, create_recipe, create_tag, register_user},
    jwt::SessionData,
    pool,
    schema::{Ingredient, IngredientAmount, Recipe, RecipeWrite, RegisterUser, Tag, User, UserRole},
};
use sqlx::{Pool, Sqlite};

pub const TEST_SECRET: &str = "integration-test-secret-of-sufficient-length";

pub async fn test_pool() -> Pool<Sqlite> {
    let db = pool::connect("sqlite::memory:", 1).await.unwrap();
    pool::migrate(&db).await.unwrap();
    db
}

pub fn registration(name: &str) -> RegisterUser {
    RegisterUser {
        email: format!("{name}@example.com"),
        username: name.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("Cook"),
        password: String::from("long-enough-password"),
    }
}

pub async fn user(db: &Pool<Sqlite>, name: &str) -> User {
    register_user(registration(name), db).await.unwrap()
}

pub fn session(user: &User) -> SessionData {
    SessionData {
        user_id: user.id,
        username: user.username.to_owned(),
        role: user.role.to_owned(),
    }
}

pub async fn admin(db: &Pool<Sqlite>, name: &str) -> User {
    let mut user = user(db, name).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(user.id)
        .execute(db)
        .await
        .unwrap();
    user.role = UserRole::Admin;
    user
}

pub async fn tag(db: &Pool<Sqlite>, slug: &str) -> Tag {
    create_tag(slug, slug, db).await.unwrap()
}

pub async fn ingredient(db: &Pool<Sqlite>, name: &str, unit: &str) -> Ingredient {
    create_ingredient(name, unit, db).await.unwrap()
}

pub fn write(name: &str, tags: &[&Tag], parts: &[(&Ingredient, i64)]) -> RecipeWrite {
    RecipeWrite {
        tags: Some(tags.iter().map(|tag| tag.id).collect()),
        ingredients: Some(
            parts
                .iter()
                .map(|(ingredient, amount)| IngredientAmount {
                    id: ingredient.id,
                    amount: *amount,
                })
                .collect(),
        ),
        name: Some(name.to_string()),
        text: Some(String::from("Cook it well.")),
        cooking_time: Some(15),
        image: Some(String::from("data:image/png;base64,iVBORw0KGgo=")),
    }
}

pub async fn recipe(
    db: &Pool<Sqlite>,
    author: &User,
    name: &str,
    tags: &[&Tag],
    parts: &[(&Ingredient, i64)],
) -> Recipe {
    create_recipe(&session(author), write(name, tags, parts), db)
        .await
        .unwrap()
}

pub async fn count(db: &Pool<Sqlite>, sql: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(sql).fetch_one(db).await.unwrap();
    row.0
}
