pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::{authenticate, handlers as auth_handlers};
use crate::practice_log;
use crate::state::AppState;
use crate::video_log;

pub fn build_router(state: AppState) -> Router {
    let v1 = practice_log::routes()
        .merge(video_log::v1_routes())
        .route("/token/validate", post(auth_handlers::handle_validate_token));
    let v2 = practice_log::routes().merge(video_log::v2_routes());

    let api = Router::new()
        .nest("/api/v1", v1)
        .nest("/api/v2", v2)
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api)
        .with_state(state)
}
