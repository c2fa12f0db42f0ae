pub mod response;
pub mod security;
pub mod session;

pub use response::{ApiResponse, ApiResult};
pub use security::security_headers_middleware;
pub use session::{session_middleware, SessionCookies};
