// Bearer token authentication

pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use errors::AuthError;
pub use jwt::{extract_bearer_token, JwtService};
pub use middleware::{cors_layer, jwt_auth_middleware};
pub use models::{AuthenticatedUser, Claims};
