//! HTTP surface: caller identity, responses and the guard sidecar server.

mod auth;
mod response;
mod server;
mod service;

pub use auth::{
    bearer_token, AnonymousAuthenticator, AuthContext, Authenticator, StaticTokenAuthenticator,
};
pub use response::{
    build_rejection_response, build_validation_error_response, cors_headers, json_response,
    X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
pub use server::HttpServer;
pub use service::GuardService;
