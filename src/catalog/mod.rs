// src/catalog/mod.rs
pub mod twitch_gql;
pub mod types;

pub use types::{Campaign, CatalogClient, Game};
