pub mod json;
pub mod repo;

pub use json::JsonIndex;
pub use repo::IndexStore;
