pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtManager, TokenType};
pub use middleware::CurrentUser;
pub use password::PasswordService;
