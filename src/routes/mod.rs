pub mod auth;
pub mod perfumes;
pub mod roles;
pub mod users;

use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(index))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/protected", get(auth::protected))
        // Users
        .route("/user/all", get(users::list))
        .route("/user/id/{id}", get(users::get))
        .route("/user/update/{id}", put(users::update))
        .route("/user/delete/{id}", delete(users::delete))
        // Roles
        .route("/role/create", post(roles::create))
        .route("/role/all", get(roles::list))
        // Perfumes
        .route("/fume/create", post(perfumes::create))
        .route("/fume/insert", post(perfumes::insert))
        .route("/fume/all", get(perfumes::list))
        .route("/fume/id/{id}", get(perfumes::get))
        .route("/fume/search", get(perfumes::search))
        .route("/fume/update/{id}", put(perfumes::update))
        .route("/fume/delete/{id}", delete(perfumes::delete))
}

async fn index() -> &'static str {
    "Hello, Elfume connected!"
}
