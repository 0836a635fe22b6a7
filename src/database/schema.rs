use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::USERNAME_REGEX;

pub type Uuid = i64;

static RE_USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(USERNAME_REGEX).expect("username pattern compiles"));

#[derive(
    Clone, Debug, Default, PartialEq, PartialOrd, sqlx::Type, Serialize, Deserialize, Eq, Ord, Hash,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub avatar: Option<String>,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub image: String,
    pub pub_date: DateTime<Utc>,
}

/// An ingredient line of a recipe, joined with the ingredient itself.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePart {
    #[serde(skip)]
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// The two user-recipe markings. Both live in structurally identical tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
}

impl RelationKind {
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping_carts",
        }
    }

    pub fn verbose_name(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping cart",
        }
    }
}

// Representations

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserView {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
            avatar: user.avatar.to_owned(),
        }
    }
}

/// Returned right after registration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for CreatedUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipePart>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ShortRecipe {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

impl From<&Recipe> for ShortRecipe {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

// Payloads

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct RegisterUser {
    #[validate(email(message = "Enter a valid email address"), length(max = 254))]
    pub email: String,
    #[validate(
        length(min = 1, max = 150),
        regex(
            path = *RE_USERNAME,
            message = "Username may only contain letters, digits and . @ + - _"
        )
    )]
    pub username: String,
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct SetPassword {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AvatarPayload {
    pub avatar: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i64,
}

/// Create/update body for a recipe. Every field is optional at the parsing
/// stage so that missing fields surface as field-level validation errors.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RecipeWrite {
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
}

/// A recipe write that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub image: Option<String>,
}

// Queries

/// Recipe listing filters. Built from raw query pairs because `tags` repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    /// `Some(false)` keeps only recipes outside the viewer's favorites.
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl RecipeFilter {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => filter.author = value.parse().ok(),
                "tags" if !value.is_empty() => filter.tags.push(value),
                "is_favorited" => filter.is_favorited = parse_flag(&value),
                "is_in_shopping_cart" => filter.is_in_shopping_cart = parse_flag(&value),
                "page" => filter.page = value.parse().ok(),
                "limit" => filter.limit = value.parse().ok(),
                _ => {}
            }
        }

        filter
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SubscriptionQuery {
    pub recipes_limit: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn recipe_filter_collects_repeated_tags() {
        let filter = RecipeFilter::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("tags", "dinner"),
            ("author", "3"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "0"),
            ("page", "2"),
        ]));

        assert_eq!(filter.tags, vec!["breakfast", "dinner"]);
        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.is_favorited, Some(true));
        assert_eq!(filter.is_in_shopping_cart, Some(false));
        assert_eq!(filter.page, Some(2));
        assert_eq!(filter.limit, None);
    }

    #[test]
    fn recipe_filter_ignores_garbage() {
        let filter = RecipeFilter::from_pairs(pairs(&[
            ("author", "bob"),
            ("is_favorited", "yes"),
            ("unknown", "1"),
            ("tags", ""),
        ]));
        assert_eq!(filter, RecipeFilter::default());
    }

    #[test]
    fn register_user_validation() {
        let mut input = RegisterUser {
            email: String::from("cook@example.com"),
            username: String::from("cook.book+1"),
            first_name: String::from("Ann"),
            last_name: String::from("Smith"),
            password: String::from("long-enough"),
        };
        assert!(input.validate().is_ok());

        input.username = String::from("no spaces");
        assert!(input.validate().is_err());

        input.username = String::from("cook");
        input.email = String::from("not-an-email");
        assert!(input.validate().is_err());
    }

    #[test]
    fn subscription_flattens_author() {
        let view = SubscriptionView {
            author: UserView {
                email: String::from("a@b.c"),
                id: 1,
                username: String::from("a"),
                first_name: String::from("A"),
                last_name: String::from("B"),
                is_subscribed: true,
                avatar: None,
            },
            recipes: vec![],
            recipes_count: 0,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["username"], "a");
        assert_eq!(value["is_subscribed"], true);
        assert_eq!(value["recipes_count"], 0);
    }
}
