pub mod http;
pub mod jwt;

pub use jwt::{JwtKeys, TokenClaims};
