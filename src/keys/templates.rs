//! Keys for card templates.

use super::{EntityId, QueryKey, Tag};

/// `[templates]`
pub fn all() -> QueryKey {
    QueryKey::root(Tag::Templates)
}

/// `[templates, id]`
pub fn detail(id: impl Into<EntityId>) -> QueryKey {
    all().child(id.into())
}

/// `[template_decks, id]`: decks built from one template.
pub fn decks(id: impl Into<EntityId>) -> QueryKey {
    QueryKey::root(Tag::TemplateDecks).child(id.into())
}
