use super::{EntityId, QueryKey, Tag};

/// `[decks]`
pub fn all() -> QueryKey {
    QueryKey::root(Tag::Decks)
}

/// `[decks, id]`
pub fn detail(id: impl Into<EntityId>) -> QueryKey {
    all().child(id.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_canonical_and_nested() {
        assert_eq!(detail(42), detail("42"));
        assert_ne!(detail(42), detail(43));
        assert!(detail(42).starts_with(&all()));
        assert_eq!(
            serde_json::to_string(&detail(42)).expect("key serializes"),
            r#"["decks","42"]"#
        );
    }
}
