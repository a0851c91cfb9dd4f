//! Study services built on the query cache.

pub mod drafts;
pub mod error;
pub mod loaders;
pub mod motion;
pub mod mutations;
pub mod queries;
pub mod render;
pub mod repos;
