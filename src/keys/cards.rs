//! Keys for cards and their per-deck listings.
//!
//! `[cards_count, deck]` is deliberately outside the `[cards]` namespace.
//! Invalidating a deck's card listing does not stale its count; callers that
//! change how many cards a deck holds must invalidate both (see
//! `cache::planner`).

use super::{EntityId, FilterRecord, QueryKey, Tag};

pub const DEFAULT_PAGE: u32 = 0;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Pagination parameters for a deck's card listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPageParams {
    pub deck_id: EntityId,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl CardPageParams {
    pub fn new(deck_id: impl Into<EntityId>) -> Self {
        Self {
            deck_id: deck_id.into(),
            page: None,
            page_size: None,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn record(&self) -> FilterRecord {
        FilterRecord::new()
            .with("page", self.page.unwrap_or(DEFAULT_PAGE))
            .with("pageSize", self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

/// `[cards, deckId]`: every card listing of one deck.
pub fn deck(deck_id: impl Into<EntityId>) -> QueryKey {
    QueryKey::root(Tag::Cards).child(deck_id.into())
}

/// `[cards, id]`: a single card.
///
/// Shares its shape with [`deck`], so a card id equal to a deck id lands in
/// the same subtree.
pub fn detail(id: impl Into<EntityId>) -> QueryKey {
    QueryKey::root(Tag::Cards).child(id.into())
}

/// `[cards, deckId, {page, pageSize}]`
pub fn paginated(params: &CardPageParams) -> QueryKey {
    deck(params.deck_id.clone()).child(params.record())
}

/// `[cards_count, deckId]`
pub fn count(deck_id: impl Into<EntityId>) -> QueryKey {
    QueryKey::root(Tag::CardsCount).child(deck_id.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginated_extends_deck_key() {
        let key = paginated(&CardPageParams::new(7).page(2));
        assert!(key.starts_with(&deck(7)));
        assert_eq!(key.len(), deck(7).len() + 1);
    }

    #[test]
    fn missing_pagination_fields_default() {
        let implicit = paginated(&CardPageParams::new(7));
        let explicit = paginated(&CardPageParams::new("7").page(0).page_size(DEFAULT_PAGE_SIZE));
        assert_eq!(implicit, explicit);
        assert_eq!(implicit.to_string(), "[cards, 7, {page: 0, pageSize: 20}]");
    }

    #[test]
    fn different_pages_do_not_collide() {
        let first = paginated(&CardPageParams::new(7).page(1));
        let second = paginated(&CardPageParams::new(7).page(2));
        let resized = paginated(&CardPageParams::new(7).page(1).page_size(50));
        assert_ne!(first, second);
        assert_ne!(first, resized);
    }

    #[test]
    fn count_is_not_under_cards() {
        assert!(!count(7).starts_with(&deck(7)));
        assert_eq!(count(7).tag(), Some(Tag::CardsCount));
    }

    #[test]
    fn scenario_shape() {
        let key = paginated(&CardPageParams::new(42).page(1).page_size(20));
        assert_eq!(
            serde_json::to_string(&key).expect("key serializes"),
            r#"["cards","42",{"page":"1","pageSize":"20"}]"#
        );
    }
}
