pub mod extractor;
pub mod jwt;
pub mod password;
pub mod service;
pub mod validator;

pub use extractor::AuthUser;
pub use jwt::{Claims, TokenIssuer};
pub use service::{AuthError, AuthService, Credentials, Registration, Session};
