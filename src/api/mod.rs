pub mod routes;
mod server;
pub use server::{SharedState, app, serve};
pub mod public;
