pub mod user_service;
pub mod view_counter;

pub use user_service::{UserService, UserServiceError};
pub use view_counter::ViewCounter;
