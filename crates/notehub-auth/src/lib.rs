pub mod oidc;

pub use oidc::{AuthenticatedUser, OIDCClient, OIDCSecrets};
