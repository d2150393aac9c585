pub mod auth;
pub mod response;
pub mod validate;

pub use auth::{CurrentUser, MaybeUser};
pub use response::{ApiResponse, ApiResult};
pub use validate::ValidJson;
