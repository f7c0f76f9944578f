// Authentication module
// Token lifecycle management for the vendor cloud

mod endpoint;
mod token_manager;
mod types;

pub use endpoint::{AuthEndpoint, HttpAuthEndpoint};
pub use token_manager::{TokenManager, MAX_RENEWAL_RETRIES, MIN_TOKEN_AGE, RENEWAL_MARGIN_SECS};
pub use types::Token;
