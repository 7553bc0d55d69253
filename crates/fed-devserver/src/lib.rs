//! Local development server for a federation host.
//!
//! Serves the host's entry manifest and exposed module sources so remotes on
//! other local ports can fetch them across origins. The permissive CORS mode
//! exists for exactly that multi-process local setup and must not be
//! reproduced in deployed form; anything production-shaped goes through an
//! explicit origin list.

mod server;

pub use server::*;
