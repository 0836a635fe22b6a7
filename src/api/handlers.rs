use chrono::Local;
use serde_json::json;
use warp::{
    http::{StatusCode, Uri},
    reply::{self, Reply, Response},
};

use crate::{
    actions::{
        add_relation, cart_recipes, create_recipe, delete_recipe, fetch_recipes,
        fetch_subscriptions, fetch_users, follow, get_ingredient, get_recipe, get_tag,
        list_tags, login_user, recipe_view, register_user, remove_relation, render_shopping_list,
        require_recipe, require_user, search_ingredients, set_avatar, set_password,
        shopping_list, shopping_list_filename, subscription_view, unfollow, update_recipe,
        user_view,
    },
    error::ApiError,
    jwt::SessionData,
    permissions::ActionType,
    schema::{
        AvatarPayload, CreatedUser, IngredientQuery, LoginCredentials, PageQuery, RecipeFilter,
        RecipeWrite, RegisterUser, RelationKind, SetPassword, SubscriptionQuery, Uuid,
    },
    shortlink,
};

use super::filters::AppState;

pub type HandlerResult = Result<Response, ApiError>;

/// Turns a failed handler into its JSON error response.
pub fn finish(result: HandlerResult) -> Response {
    result.unwrap_or_else(|e| e.into_response())
}

fn created<T: serde::Serialize>(body: &T) -> Response {
    reply::with_status(reply::json(body), StatusCode::CREATED).into_response()
}

fn ok<T: serde::Serialize>(body: &T) -> Response {
    reply::json(body).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn viewer(session: &Option<SessionData>) -> Option<Uuid> {
    session.as_ref().map(|session| session.user_id)
}

// Users

pub async fn register(state: AppState, input: RegisterUser) -> HandlerResult {
    let user = register_user(input, &state.pool).await?;

    Ok(created(&CreatedUser::from(&user)))
}

pub async fn login(state: AppState, input: LoginCredentials) -> HandlerResult {
    let token = login_user(&input.email, &input.password, &state.keys, &state.pool).await?;

    Ok(ok(&json!({ "auth_token": token })))
}

/// Sessions are stateless tokens, so there is nothing to revoke server side.
pub async fn logout(session: SessionData) -> HandlerResult {
    log::debug!("User {} logged out", session.user_id);

    Ok(no_content())
}

pub async fn list_users(
    state: AppState,
    session: Option<SessionData>,
    query: PageQuery,
) -> HandlerResult {
    let page = fetch_users(
        viewer(&session),
        state.page_request(query.page, query.limit),
        &state.pool,
    )
    .await?;

    Ok(ok(&page))
}

pub async fn get_user(state: AppState, id: Uuid, session: Option<SessionData>) -> HandlerResult {
    let user = require_user(&state.pool, id).await?;

    Ok(ok(&user_view(&user, viewer(&session), &state.pool).await?))
}

pub async fn me(state: AppState, session: SessionData) -> HandlerResult {
    let user = require_user(&state.pool, session.user_id).await?;

    Ok(ok(&user_view(&user, Some(session.user_id), &state.pool).await?))
}

pub async fn put_avatar(
    state: AppState,
    session: SessionData,
    input: AvatarPayload,
) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnProfile)?;

    let avatar = input
        .avatar
        .filter(|avatar| !avatar.trim().is_empty())
        .ok_or_else(|| ApiError::validation("avatar", "This field is required"))?;

    set_avatar(session.user_id, Some(avatar.to_owned()), &state.pool).await?;

    Ok(ok(&AvatarPayload {
        avatar: Some(avatar),
    }))
}

pub async fn delete_avatar(state: AppState, session: SessionData) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnProfile)?;
    set_avatar(session.user_id, None, &state.pool).await?;

    Ok(no_content())
}

pub async fn change_password(
    state: AppState,
    session: SessionData,
    input: SetPassword,
) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnProfile)?;
    set_password(session.user_id, input, &state.pool).await?;

    Ok(no_content())
}

// Subscriptions

pub async fn subscriptions(
    state: AppState,
    session: SessionData,
    query: SubscriptionQuery,
) -> HandlerResult {
    let page = fetch_subscriptions(
        session.user_id,
        query.recipes_limit,
        state.page_request(query.page, query.limit),
        &state.pool,
    )
    .await?;

    Ok(ok(&page))
}

pub async fn subscribe(
    state: AppState,
    author_id: Uuid,
    session: SessionData,
    query: SubscriptionQuery,
) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnRelations)?;

    let author = follow(session.user_id, author_id, &state.pool).await?;
    let view =
        subscription_view(&author, session.user_id, query.recipes_limit, &state.pool).await?;

    Ok(created(&view))
}

pub async fn unsubscribe(state: AppState, author_id: Uuid, session: SessionData) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnRelations)?;
    unfollow(session.user_id, author_id, &state.pool).await?;

    Ok(no_content())
}

// Tags and ingredients

pub async fn tags(state: AppState) -> HandlerResult {
    Ok(ok(&list_tags(&state.pool).await?))
}

pub async fn tag(state: AppState, id: Uuid) -> HandlerResult {
    let tag = get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No tag exists with id {id}")))?;

    Ok(ok(&tag))
}

pub async fn ingredients(state: AppState, query: IngredientQuery) -> HandlerResult {
    let found = search_ingredients(query.name.as_deref(), &state.pool).await?;

    Ok(ok(&found))
}

pub async fn ingredient(state: AppState, id: Uuid) -> HandlerResult {
    let ingredient = get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No ingredient exists with id {id}")))?;

    Ok(ok(&ingredient))
}

// Recipes

pub async fn list_recipes(
    state: AppState,
    session: Option<SessionData>,
    pairs: Vec<(String, String)>,
) -> HandlerResult {
    let filter = RecipeFilter::from_pairs(pairs);
    let request = state.page_request(filter.page, filter.limit);

    let page = fetch_recipes(&filter, viewer(&session), request, &state.pool).await?;

    Ok(ok(&page))
}

pub async fn get_recipe_detail(
    state: AppState,
    id: Uuid,
    session: Option<SessionData>,
) -> HandlerResult {
    let recipe = require_recipe(id, &state.pool).await?;

    Ok(ok(&recipe_view(&recipe, viewer(&session), &state.pool).await?))
}

pub async fn post_recipe(state: AppState, session: SessionData, input: RecipeWrite) -> HandlerResult {
    let recipe = create_recipe(&session, input, &state.pool).await?;

    Ok(created(
        &recipe_view(&recipe, Some(session.user_id), &state.pool).await?,
    ))
}

pub async fn patch_recipe(
    state: AppState,
    id: Uuid,
    session: SessionData,
    input: RecipeWrite,
) -> HandlerResult {
    let recipe = update_recipe(id, &session, input, &state.pool).await?;

    Ok(ok(&recipe_view(&recipe, Some(session.user_id), &state.pool).await?))
}

pub async fn remove_recipe(state: AppState, id: Uuid, session: SessionData) -> HandlerResult {
    delete_recipe(id, &session, &state.pool).await?;

    Ok(no_content())
}

pub async fn get_link(state: AppState, id: Uuid) -> HandlerResult {
    let recipe = require_recipe(id, &state.pool).await?;
    let link = shortlink::short_link(&state.base_url, recipe.id)
        .ok_or_else(|| ApiError::Internal(format!("recipe id {} has no short code", recipe.id)))?;

    Ok(ok(&json!({ "short-link": link })))
}

pub async fn add_to(
    kind: RelationKind,
    state: AppState,
    id: Uuid,
    session: SessionData,
) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let recipe = add_relation(kind, session.user_id, id, &state.pool).await?;

    Ok(created(&recipe))
}

pub async fn remove_from(
    kind: RelationKind,
    state: AppState,
    id: Uuid,
    session: SessionData,
) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnRelations)?;
    remove_relation(kind, session.user_id, id, &state.pool).await?;

    Ok(no_content())
}

pub async fn download_shopping_cart(state: AppState, session: SessionData) -> HandlerResult {
    let today = Local::now().date_naive();
    let lines = shopping_list(session.user_id, &state.pool).await?;
    let recipes = cart_recipes(session.user_id, &state.pool).await?;

    let body = render_shopping_list(today, &lines, &recipes);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        shopping_list_filename(today)
    );

    Ok(reply::with_header(
        reply::with_header(body, "content-type", "text/plain; charset=utf-8"),
        "content-disposition",
        disposition,
    )
    .into_response())
}

// Short links

pub async fn follow_short_link(state: AppState, code: String) -> HandlerResult {
    let id = shortlink::decode(&code)
        .ok_or_else(|| ApiError::not_found(format!("Unknown short link {code}")))?;

    let recipe = get_recipe(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Unknown short link {code}")))?;

    let uri: Uri = format!("/recipes/{}/", recipe.id)
        .parse()
        .map_err(|e| ApiError::Internal(format!("bad redirect target: {e}")))?;

    Ok(warp::redirect::found(uri).into_response())
}
