//! Keys for study lessons.
//!
//! Lesson lists are keyed by their filter record. Unset id filters are left
//! out of the record, so "no deck filter" is a distinct, stable key.
//! `dueOnly` always appears and defaults to `false`, which is what the fetch
//! layer assumes when it is unset.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use serde::{Deserialize, Serialize};

use super::{EntityId, FilterRecord, QueryKey, Tag};

/// Filters accepted by the lesson list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonFilters {
    pub algorithm_id: Option<EntityId>,
    pub deck_id: Option<EntityId>,
    pub template_id: Option<EntityId>,
    pub due_only: Option<bool>,
}

impl LessonFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn algorithm(mut self, id: impl Into<EntityId>) -> Self {
        self.algorithm_id = Some(id.into());
        self
    }

    pub fn deck(mut self, id: impl Into<EntityId>) -> Self {
        self.deck_id = Some(id.into());
        self
    }

    pub fn template(mut self, id: impl Into<EntityId>) -> Self {
        self.template_id = Some(id.into());
        self
    }

    pub fn due_only(mut self, due_only: bool) -> Self {
        self.due_only = Some(due_only);
        self
    }

    fn record(&self) -> FilterRecord {
        FilterRecord::new()
            .with_opt("algorithmId", self.algorithm_id.as_ref())
            .with_opt("deckId", self.deck_id.as_ref())
            .with("dueOnly", self.due_only.unwrap_or(false))
            .with_opt("templateId", self.template_id.as_ref())
    }
}

/// Which queue a lesson draws cards from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    New,
    Learn,
    Review,
}

impl LessonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::New => "new",
            LessonKind::Learn => "learn",
            LessonKind::Review => "review",
        }
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lesson kind `{0}` (expected new, learn or review)")]
pub struct ParseLessonKindError(pub String);

impl FromStr for LessonKind {
    type Err = ParseLessonKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(LessonKind::New),
            "learn" => Ok(LessonKind::Learn),
            "review" => Ok(LessonKind::Review),
            other => Err(ParseLessonKindError(other.to_string())),
        }
    }
}

/// Parameters identifying the cards of one lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonParams {
    pub deck_id: EntityId,
    pub kind: LessonKind,
}

impl LessonParams {
    pub fn new(deck_id: impl Into<EntityId>, kind: LessonKind) -> Self {
        Self {
            deck_id: deck_id.into(),
            kind,
        }
    }

    fn record(&self) -> FilterRecord {
        FilterRecord::new()
            .with("deckId", &self.deck_id)
            .with("kind", self.kind)
    }
}

/// `[lessons]`: prefix of every filtered lesson list.
pub fn all() -> QueryKey {
    QueryKey::root(Tag::Lessons)
}

/// `[lessons, {filters}]`
pub fn list(filters: &LessonFilters) -> QueryKey {
    all().child(filters.record())
}

/// `[lesson_data, {deckId, kind}]`
pub fn data(params: &LessonParams) -> QueryKey {
    all_data().child(params.record())
}

/// `[lesson_data]`: prefix of every lesson's card data.
pub fn all_data() -> QueryKey {
    QueryKey::root(Tag::LessonData)
}

/// `[today_review_totals]`
pub fn today_review_totals() -> QueryKey {
    QueryKey::root(Tag::TodayReviewTotals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_canonicalize_ids() {
        let a = list(&LessonFilters::new().deck(3).due_only(true));
        let b = list(&LessonFilters::new().due_only(true).deck("3"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "[lessons, {deckId: 3, dueOnly: true}]");
    }

    #[test]
    fn unfiltered_list_differs_from_filtered() {
        let unfiltered = list(&LessonFilters::new());
        let filtered = list(&LessonFilters::new().template(1));
        assert_ne!(unfiltered, filtered);
        assert_eq!(unfiltered.to_string(), "[lessons, {dueOnly: false}]");
        assert!(filtered.starts_with(&all()));
    }

    #[test]
    fn unset_due_only_defaults_to_false() {
        let unset = list(&LessonFilters::new());
        let explicit = list(&LessonFilters::new().due_only(false));
        assert_eq!(unset, explicit);
        assert_ne!(unset, list(&LessonFilters::new().due_only(true)));

        let by_deck = list(&LessonFilters::new().deck(4));
        assert_eq!(by_deck, list(&LessonFilters::new().deck("4").due_only(false)));
        assert_eq!(by_deck.to_string(), "[lessons, {deckId: 4, dueOnly: false}]");
    }

    #[test]
    fn lesson_kinds_parse_their_names() {
        for kind in [LessonKind::New, LessonKind::Learn, LessonKind::Review] {
            assert_eq!(kind.as_str().parse(), Ok(kind));
        }
        assert_eq!(
            "later".parse::<LessonKind>(),
            Err(ParseLessonKindError("later".to_string()))
        );
    }

    #[test]
    fn lesson_data_is_keyed_by_deck_and_kind() {
        let review = data(&LessonParams::new(3, LessonKind::Review));
        let learn = data(&LessonParams::new(3, LessonKind::Learn));
        assert_ne!(review, learn);
        assert!(review.starts_with(&all_data()));
        assert!(!review.starts_with(&all()));
        assert_eq!(review.to_string(), "[lesson_data, {deckId: 3, kind: review}]");
    }

    #[test]
    fn totals_key() {
        assert_eq!(today_review_totals().to_string(), "[today_review_totals]");
    }
}
