use super::{EntityId, QueryKey, Tag};

/// `[reviews, cardId]`: review history of one card.
pub fn card(card_id: impl Into<EntityId>) -> QueryKey {
    QueryKey::root(Tag::Reviews).child(card_id.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_key() {
        assert_eq!(card(9), card("9"));
        assert_eq!(card(9).to_string(), "[reviews, 9]");
    }
}
