//! Guard service: identity, admission and validation for one request.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::auth::{AnonymousAuthenticator, Authenticator, StaticTokenAuthenticator};
use super::response::{
    build_rejection_response, build_validation_error_response, cors_headers, json_response,
    X_RATELIMIT_REMAINING,
};
use crate::config::GuardConfig;
use crate::ratelimit::{
    key_prefix, Category, LimitKey, MemoryStore, PolicyTable, RateLimiter, SystemClock, Tier,
    DEFAULT_TRUSTED_IP_HEADER,
};
use crate::validation::validate_payload;

/// Runs the guard pipeline for incoming requests.
pub struct GuardService {
    /// The rate limiter instance
    rate_limiter: Arc<RateLimiter>,
    policies: PolicyTable,
    authenticator: Arc<dyn Authenticator>,
    trusted_ip_header: String,
    cors: HeaderMap,
}

impl GuardService {
    /// Create a service with anonymous-only authentication.
    pub fn new(rate_limiter: Arc<RateLimiter>, policies: PolicyTable) -> Self {
        Self {
            rate_limiter,
            policies,
            authenticator: Arc::new(AnonymousAuthenticator),
            trusted_ip_header: DEFAULT_TRUSTED_IP_HEADER.to_string(),
            cors: cors_headers(),
        }
    }

    /// Build a service from configuration.
    pub fn from_config(config: &GuardConfig) -> Self {
        let rate_limiting = &config.rate_limiting;
        let rate_limiter = Arc::new(RateLimiter::with_parts(
            MemoryStore::new(),
            SystemClock,
            rate_limiting.sweep_interval_secs.saturating_mul(1000),
        ));

        let service = Self::new(rate_limiter, rate_limiting.policies.clone())
            .with_trusted_ip_header(rate_limiting.trusted_ip_header.clone());

        if config.auth.tokens.is_empty() {
            service
        } else {
            service.with_authenticator(Arc::new(StaticTokenAuthenticator::new(
                &config.auth.tokens,
            )))
        }
    }

    /// Replace the authenticator.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Replace the trusted client IP header.
    pub fn with_trusted_ip_header(mut self, header: impl Into<String>) -> Self {
        self.trusted_ip_header = header.into();
        self
    }

    /// The rate limiter shared by all requests.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Build the HTTP router for this service.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .route(
                "/v1/guard/:category",
                post(guard_handler).options(preflight_handler),
            )
            .with_state(self)
    }

    /// Admit and validate one request for a category.
    ///
    /// Quota is consumed before validation, so malformed requests still
    /// count against the caller.
    #[instrument(skip_all, fields(category = %category))]
    pub async fn guard(&self, category: Category, headers: &HeaderMap, body: &[u8]) -> Response {
        let auth = self.authenticator.authenticate(headers).await;
        let tier = Tier::for_caller(auth.authenticated);
        let prefix = key_prefix(category, tier);
        let key = LimitKey::from_headers(headers, &prefix, &self.trusted_ip_header).to_string();
        let policy = self.policies.select(category, auth.authenticated);

        let decision = self.rate_limiter.check(&key, &policy);
        if !decision.allowed {
            warn!(
                key = %key,
                retry_after = ?decision.retry_after,
                "Request rejected by rate limiter"
            );
            return build_rejection_response(&decision, &self.cors);
        }

        let payload: Value = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Request body is not valid JSON");
                return build_validation_error_response(
                    "Request body must be valid JSON",
                    &self.cors,
                );
            }
        };

        let fields = match validate_payload(category, &payload).into_result() {
            Ok(fields) => fields,
            Err(error) => {
                info!(key = %key, error = %error, "Request failed validation");
                return build_validation_error_response(&error, &self.cors);
            }
        };

        info!(
            key = %key,
            authenticated = auth.authenticated,
            remaining = decision.remaining,
            "Request admitted"
        );

        let body = json!({
            "allowed": true,
            "remaining": decision.remaining,
            "resetAt": decision.reset_at,
            "fields": fields,
        });
        let mut response = json_response(StatusCode::OK, &body, &self.cors);
        response
            .headers_mut()
            .insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
        response
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn guard_handler(
    State(service): State<Arc<GuardService>>,
    Path(category): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(category) = category.parse::<Category>() else {
        warn!(category = %category, "Request for unknown category");
        return json_response(
            StatusCode::NOT_FOUND,
            &json!({ "error": format!("Unknown category: {}", category) }),
            &service.cors,
        );
    };

    service.guard(category, &headers, &body).await
}

async fn preflight_handler(State(service): State<Arc<GuardService>>) -> Response {
    (StatusCode::OK, service.cors.clone(), "ok").into_response()
}
