pub mod models;
pub mod selection;
pub mod serializer;
