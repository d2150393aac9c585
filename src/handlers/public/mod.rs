// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Status endpoints, token acquisition and account registration.

pub mod register;
pub mod status;
pub mod token;

pub use register::register_post;
pub use status::{health, root};
pub use token::token_post;
