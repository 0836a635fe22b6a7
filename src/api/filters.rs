use std::convert::Infallible;

use sqlx::{Pool, Sqlite};
use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

use crate::{
    config::Settings,
    constants::{
        API_PREFIX, AVATAR_POINT, DOWNLOAD_CART_POINT, FAVORITES_POINT, GET_LINK_POINT,
        MAX_BODY_SIZE, SELF_PROFILE_POINT, SET_PASSWORD_POINT, SHOPPING_CART_POINT,
        SHORT_LINK_PREFIX, SUBSCRIBE_POINT, SUBSCRIPTIONS_POINT,
    },
    error::ApiError,
    jwt::{SessionData, SessionKeys},
    logging::HTTP_LOG_TARGET,
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    schema::{
        AvatarPayload, IngredientQuery, LoginCredentials, PageQuery, RecipeWrite, RegisterUser,
        RelationKind, SetPassword, SubscriptionQuery, Uuid,
    },
};

use super::{
    handlers::{self, finish},
    rejection::handle_rejection,
};

/// Everything a request handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Sqlite>,
    pub keys: SessionKeys,
    pub base_url: String,
    pub page_size: i64,
    pub max_page_size: i64,
}

impl AppState {
    pub fn new(pool: Pool<Sqlite>, settings: &Settings) -> Result<Self, ApiError> {
        Ok(Self {
            pool,
            keys: SessionKeys::new(&settings.auth.secret, settings.auth.token_lifetime_hours)?,
            base_url: settings.server.base_url.to_owned(),
            page_size: settings.pagination.page_size,
            max_page_size: settings.pagination.max_page_size,
        })
    }

    pub fn page_request(&self, page: Option<i64>, limit: Option<i64>) -> PageRequest {
        PageRequest::new(page, limit, self.page_size, self.max_page_size)
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn users(state: &AppState) -> BoxedFilter<(Response,)> {
    let users = || warp::path(API_PREFIX).and(warp::path("users"));
    let session = || with_session(state.keys.clone());
    let possible_session = || with_possible_session(state.keys.clone());

    let register = users()
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body::<RegisterUser>())
        .then(handlers::register)
        .map(finish);

    let list = users()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(possible_session())
        .and(warp::query::<PageQuery>())
        .then(handlers::list_users)
        .map(finish);

    let me = users()
        .and(warp::path(SELF_PROFILE_POINT))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(session())
        .then(handlers::me)
        .map(finish);

    let avatar = || {
        users()
            .and(warp::path(SELF_PROFILE_POINT))
            .and(warp::path(AVATAR_POINT))
            .and(warp::path::end())
    };

    let put_avatar = avatar()
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(session())
        .and(json_body::<AvatarPayload>())
        .then(handlers::put_avatar)
        .map(finish);

    let delete_avatar = avatar()
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(session())
        .then(handlers::delete_avatar)
        .map(finish);

    let set_password = users()
        .and(warp::path(SET_PASSWORD_POINT))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(session())
        .and(json_body::<SetPassword>())
        .then(handlers::change_password)
        .map(finish);

    let subscriptions = users()
        .and(warp::path(SUBSCRIPTIONS_POINT))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(session())
        .and(warp::query::<SubscriptionQuery>())
        .then(handlers::subscriptions)
        .map(finish);

    let detail = users()
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(possible_session())
        .then(|id: Uuid, state: AppState, session: Option<SessionData>| {
            handlers::get_user(state, id, session)
        })
        .map(finish);

    let subscribe_path = || {
        users()
            .and(warp::path::param::<Uuid>())
            .and(warp::path(SUBSCRIBE_POINT))
            .and(warp::path::end())
    };

    let subscribe = subscribe_path()
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(session())
        .and(warp::query::<SubscriptionQuery>())
        .then(|id: Uuid, state: AppState, session: SessionData, query: SubscriptionQuery| {
            handlers::subscribe(state, id, session, query)
        })
        .map(finish);

    let unsubscribe = subscribe_path()
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(session())
        .then(|id: Uuid, state: AppState, session: SessionData| {
            handlers::unsubscribe(state, id, session)
        })
        .map(finish);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(put_avatar)
        .unify()
        .or(delete_avatar)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(detail)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn auth(state: &AppState) -> BoxedFilter<(Response,)> {
    let token = || {
        warp::path(API_PREFIX)
            .and(warp::path("auth"))
            .and(warp::path("token"))
    };

    let login = token()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body::<LoginCredentials>())
        .then(handlers::login)
        .map(finish);

    let logout = token()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session(state.keys.clone()))
        .then(handlers::logout)
        .map(finish);

    login.or(logout).unify().boxed()
}

fn catalogue(state: &AppState) -> BoxedFilter<(Response,)> {
    let tags = || warp::path(API_PREFIX).and(warp::path("tags"));
    let ingredients = || warp::path(API_PREFIX).and(warp::path("ingredients"));

    let tag_list = tags()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(handlers::tags)
        .map(finish);

    let tag_detail = tags()
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(|id: Uuid, state: AppState| handlers::tag(state, id))
        .map(finish);

    let ingredient_list = ingredients()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(warp::query::<IngredientQuery>())
        .then(handlers::ingredients)
        .map(finish);

    let ingredient_detail = ingredients()
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(|id: Uuid, state: AppState| handlers::ingredient(state, id))
        .map(finish);

    tag_list
        .or(tag_detail)
        .unify()
        .or(ingredient_list)
        .unify()
        .or(ingredient_detail)
        .unify()
        .boxed()
}

fn relation(state: &AppState, point: &'static str, kind: RelationKind) -> BoxedFilter<(Response,)> {
    let path = || {
        warp::path(API_PREFIX)
            .and(warp::path("recipes"))
            .and(warp::path::param::<Uuid>())
            .and(warp::path(point))
            .and(warp::path::end())
    };

    let add = path()
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.keys.clone()))
        .then(move |id: Uuid, state: AppState, session: SessionData| {
            handlers::add_to(kind, state, id, session)
        })
        .map(finish);

    let remove = path()
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_session(state.keys.clone()))
        .then(move |id: Uuid, state: AppState, session: SessionData| {
            handlers::remove_from(kind, state, id, session)
        })
        .map(finish);

    add.or(remove).unify().boxed()
}

fn recipes(state: &AppState) -> BoxedFilter<(Response,)> {
    let recipes = || warp::path(API_PREFIX).and(warp::path("recipes"));
    let session = || with_session(state.keys.clone());
    let possible_session = || with_possible_session(state.keys.clone());

    let list = recipes()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(possible_session())
        .and(warp::query::<Vec<(String, String)>>())
        .then(handlers::list_recipes)
        .map(finish);

    let create = recipes()
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(session())
        .and(json_body::<RecipeWrite>())
        .then(handlers::post_recipe)
        .map(finish);

    let download = recipes()
        .and(warp::path(DOWNLOAD_CART_POINT))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(session())
        .then(handlers::download_shopping_cart)
        .map(finish);

    let item = || {
        recipes()
            .and(warp::path::param::<Uuid>())
            .and(warp::path::end())
    };

    let detail = item()
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(possible_session())
        .then(|id: Uuid, state: AppState, session: Option<SessionData>| {
            handlers::get_recipe_detail(state, id, session)
        })
        .map(finish);

    let update = item()
        .and(warp::patch())
        .and(with_state(state.clone()))
        .and(session())
        .and(json_body::<RecipeWrite>())
        .then(|id: Uuid, state: AppState, session: SessionData, input: RecipeWrite| {
            handlers::patch_recipe(state, id, session, input)
        })
        .map(finish);

    let delete = item()
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(session())
        .then(|id: Uuid, state: AppState, session: SessionData| {
            handlers::remove_recipe(state, id, session)
        })
        .map(finish);

    let get_link = recipes()
        .and(warp::path::param::<Uuid>())
        .and(warp::path(GET_LINK_POINT))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(|id: Uuid, state: AppState| handlers::get_link(state, id))
        .map(finish);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(get_link)
        .unify()
        .or(relation(state, FAVORITES_POINT, RelationKind::Favorite))
        .unify()
        .or(relation(state, SHOPPING_CART_POINT, RelationKind::ShoppingCart))
        .unify()
        .boxed()
}

fn short_links(state: &AppState) -> BoxedFilter<(Response,)> {
    warp::path(SHORT_LINK_PREFIX)
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(|code: String, state: AppState| handlers::follow_short_link(state, code))
        .map(finish)
        .boxed()
}

/// The complete service: every endpoint, error recovery and access logging.
pub fn routes(state: AppState) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let log = warp::log::custom(|info| {
        log::info!(
            target: HTTP_LOG_TARGET,
            "{} {} {} {:?}",
            info.method(),
            info.path(),
            info.status().as_u16(),
            info.elapsed()
        );
    });

    users(&state)
        .or(auth(&state))
        .unify()
        .or(catalogue(&state))
        .unify()
        .or(recipes(&state))
        .unify()
        .or(short_links(&state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(log)
}
