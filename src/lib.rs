//! Query cache, key taxonomy and study services of the recollect client.

pub mod application;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod infra;
pub mod keys;
