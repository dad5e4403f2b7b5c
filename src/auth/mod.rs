pub mod jwt;

pub use jwt::{create_jwt, verify_jwt, Claims};
