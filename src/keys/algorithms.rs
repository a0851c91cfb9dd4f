//! Keys for scheduling algorithms and the decks that use them.

use super::{EntityId, QueryKey, Tag};

/// `[algorithms]`
pub fn all() -> QueryKey {
    QueryKey::root(Tag::Algorithms)
}

/// `[algorithms, id]`
pub fn detail(id: impl Into<EntityId>) -> QueryKey {
    all().child(id.into())
}

/// `[algorithm_decks, id]`
///
/// Lives in its own namespace: invalidating `[algorithms]` leaves it fresh.
pub fn decks(id: impl Into<EntityId>) -> QueryKey {
    QueryKey::root(Tag::AlgorithmDecks).child(id.into())
}
