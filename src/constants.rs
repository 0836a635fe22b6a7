pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_RECIPE_COUNT_PER_PAGE: i64 = 100;

pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 32_000;
pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = 32_000;

pub const MAX_LENGTH_RECIPE_NAME: usize = 256;
pub const MAX_LENGTH_TAG_NAME: usize = 32;
pub const MAX_LENGTH_TAG_SLUG: usize = 32;
pub const MAX_LENGTH_INGREDIENT: usize = 128;
pub const MAX_LENGTH_MEASUREMENT: usize = 64;

pub const USERNAME_REGEX: &str = r"^[\w.@+-]+$";

pub const API_PREFIX: &str = "api";
pub const SELF_PROFILE_POINT: &str = "me";
pub const AVATAR_POINT: &str = "avatar";
pub const SET_PASSWORD_POINT: &str = "set_password";
pub const SUBSCRIBE_POINT: &str = "subscribe";
pub const SUBSCRIPTIONS_POINT: &str = "subscriptions";
pub const GET_LINK_POINT: &str = "get-link";
pub const FAVORITES_POINT: &str = "favorite";
pub const SHOPPING_CART_POINT: &str = "shopping_cart";
pub const DOWNLOAD_CART_POINT: &str = "download_shopping_cart";
pub const SHORT_LINK_PREFIX: &str = "s";

pub const MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;
