pub mod general;
pub mod lang;
pub mod oidc;
