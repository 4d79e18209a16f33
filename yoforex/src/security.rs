mod extractor;
pub mod jwt;
pub mod otp;
pub mod password;

pub use extractor::AuthUser;
pub use jwt::{Claims, JwtKeys};
