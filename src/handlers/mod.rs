// handlers/mod.rs - Handler tiers
//
// Public (no auth) and Protected (bearer token, with optional-auth product reads).
// Routes are assembled in server.rs.

pub mod protected;
pub mod public;
