use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::middleware::request_id_layer;
use crate::routes;
use crate::services::{ChatService, ChatStore};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub settings: Settings,
    pub verifier: TokenVerifier,
    /// Chat pipeline; holds the LLM client and router built at start-up
    pub chat: ChatService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ChatStore>,
        settings: Settings,
        verifier: TokenVerifier,
        chat: ChatService,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            settings,
            verifier,
            chat,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Spans at DEBUG keep INFO output quiet
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();
    let max_body_bytes = state.settings.max_body_bytes;

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::{ImageMatcher, IntentRouter, LlmClient, MediaUrls, MemoryStore};

    /// Application wired to an in-memory store and the given model endpoint.
    pub(crate) fn test_app(llm_api_url: &str) -> (Router, Arc<MemoryStore>, Settings) {
        let settings = Settings::for_tests(llm_api_url);
        let store = Arc::new(MemoryStore::new());
        let matcher = ImageMatcher::new(settings.image_match_threshold);
        let router = IntentRouter::new(LlmClient::new(&settings).unwrap(), matcher);
        let chat = ChatService::new(
            store.clone(),
            router,
            matcher,
            MediaUrls::from_settings(&settings).unwrap(),
        );
        let state = AppState::new(
            store.clone(),
            settings.clone(),
            TokenVerifier::from_settings(&settings),
            chat,
        );
        (create_app(state), store, settings)
    }
}
