use std::error::Error as StdError;

use async_trait::async_trait;

use crate::keys::QueryKey;

/// A cached query: the key it is stored under and how to fetch it.
///
/// Route loaders and views build the same descriptor, so a prefetched
/// entry is always the one the view reads.
#[async_trait]
pub trait Query: Clone + Send + Sync + 'static {
    type Output: Send + Sync + 'static;
    type Error: StdError + Send + Sync + 'static;

    fn key(&self) -> QueryKey;

    async fn fetch(&self) -> Result<Self::Output, Self::Error>;
}
