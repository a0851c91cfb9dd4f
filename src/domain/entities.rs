//! Records returned by the study repository.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::{CardState, ReviewGrade};
use crate::keys::lessons::LessonKind;

pub type AlgorithmId = i64;
pub type DeckId = i64;
pub type CardId = i64;
pub type TemplateId = i64;
pub type ReviewId = i64;

/// Scheduling parameters shared by every deck that uses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmRecord {
    pub id: AlgorithmId,
    pub name: String,
    /// Relearning steps in minutes before a card graduates.
    pub learning_steps: Vec<u32>,
    pub graduating_interval_days: u32,
    pub easy_interval_days: u32,
    /// Starting ease factor in thousandths (2500 = 2.5x).
    pub starting_ease: u32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateRecord {
    pub id: TemplateId,
    pub name: String,
    pub front_markdown: String,
    pub back_markdown: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A deck belongs to exactly one algorithm and one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckRecord {
    pub id: DeckId,
    pub name: String,
    pub description: Option<String>,
    pub algorithm_id: AlgorithmId,
    pub template_id: TemplateId,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardRecord {
    pub id: CardId,
    pub deck_id: DeckId,
    pub front_markdown: String,
    pub back_markdown: String,
    pub tags: Vec<String>,
    pub state: CardState,
    pub due_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One page of a deck's cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardPage {
    pub deck_id: DeckId,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub cards: Vec<CardRecord>,
}

impl CardPage {
    pub fn has_next(&self) -> bool {
        u64::from(self.page + 1) * u64::from(self.page_size) < self.total
    }
}

/// Per-deck queue sizes shown on the lesson list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonSummary {
    pub deck_id: DeckId,
    pub deck_name: String,
    pub new_count: u32,
    pub learn_count: u32,
    pub review_count: u32,
}

impl LessonSummary {
    pub fn count(&self, kind: LessonKind) -> u32 {
        match kind {
            LessonKind::New => self.new_count,
            LessonKind::Learn => self.learn_count,
            LessonKind::Review => self.review_count,
        }
    }
}

/// Cards queued for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonData {
    pub deck_id: DeckId,
    pub kind: LessonKind,
    pub cards: Vec<CardRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecord {
    pub id: ReviewId,
    pub card_id: CardId,
    pub grade: ReviewGrade,
    pub interval_days: u32,
    pub reviewed_at: OffsetDateTime,
}

/// Reviews done and still due today, across all decks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewTotals {
    pub reviewed: u32,
    pub due: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingRecord {
    pub name: String,
    /// `None` when the setting was never written.
    pub value: Option<String>,
    pub updated_at: Option<OffsetDateTime>,
}

/// Input for creating one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub deck_id: DeckId,
    pub front_markdown: String,
    pub back_markdown: String,
    pub tags: Vec<String>,
}

/// Input for editing a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckUpdate {
    pub name: String,
    pub description: Option<String>,
    pub algorithm_id: AlgorithmId,
    pub template_id: TemplateId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_page_knows_when_more_cards_follow() {
        let page = CardPage {
            deck_id: 1,
            page: 0,
            page_size: 20,
            total: 21,
            cards: Vec::new(),
        };
        assert!(page.has_next());
        assert!(!CardPage { page: 1, ..page }.has_next());
    }
}
