pub mod commands;
pub mod event_source;
pub mod session;
