//! Persistence for each entity, one module per table family. Handlers and the
//! authenticator go through these functions instead of writing SQL inline.

pub mod connections;
pub mod posts;
pub mod profiles;
pub mod users;
