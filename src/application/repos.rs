//! Repository trait describing the study data source.
//!
//! The cache never talks to storage directly: query descriptors call these
//! methods from inside their fetchers.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    AlgorithmId, AlgorithmRecord, CardId, CardPage, CardRecord, DeckId, DeckRecord, DeckUpdate,
    LessonData, LessonSummary, NewCard, ReviewRecord, ReviewTotals, SettingRecord, TemplateId,
    TemplateRecord,
};
use crate::domain::types::ReviewGrade;
use crate::keys::lessons::{LessonFilters, LessonKind};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("study data source unavailable: {0}")]
    Unavailable(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Card content as edited in the card editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardContent {
    pub front_markdown: String,
    pub back_markdown: String,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait StudyRepository: Send + Sync {
    async fn list_algorithms(&self) -> Result<Vec<AlgorithmRecord>, RepoError>;

    async fn find_algorithm(&self, id: AlgorithmId) -> Result<AlgorithmRecord, RepoError>;

    /// Decks scheduled by algorithm `id`.
    async fn list_algorithm_decks(&self, id: AlgorithmId) -> Result<Vec<DeckRecord>, RepoError>;

    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, RepoError>;

    async fn find_template(&self, id: TemplateId) -> Result<TemplateRecord, RepoError>;

    /// Decks rendered with template `id`.
    async fn list_template_decks(&self, id: TemplateId) -> Result<Vec<DeckRecord>, RepoError>;

    async fn list_decks(&self) -> Result<Vec<DeckRecord>, RepoError>;

    async fn find_deck(&self, id: DeckId) -> Result<DeckRecord, RepoError>;

    async fn update_deck(&self, id: DeckId, update: DeckUpdate) -> Result<DeckRecord, RepoError>;

    async fn list_cards(
        &self,
        deck_id: DeckId,
        page: u32,
        page_size: u32,
    ) -> Result<CardPage, RepoError>;

    async fn count_cards(&self, deck_id: DeckId) -> Result<u64, RepoError>;

    async fn find_card(&self, id: CardId) -> Result<CardRecord, RepoError>;

    async fn create_card(&self, card: NewCard) -> Result<CardRecord, RepoError>;

    async fn update_card(&self, id: CardId, content: CardContent)
    -> Result<CardRecord, RepoError>;

    /// Delete a card and return it as it was.
    async fn delete_card(&self, id: CardId) -> Result<CardRecord, RepoError>;

    async fn list_lessons(&self, filters: &LessonFilters)
    -> Result<Vec<LessonSummary>, RepoError>;

    async fn lesson_data(&self, deck_id: DeckId, kind: LessonKind)
    -> Result<LessonData, RepoError>;

    async fn today_review_totals(&self) -> Result<ReviewTotals, RepoError>;

    async fn list_reviews(&self, card_id: CardId) -> Result<Vec<ReviewRecord>, RepoError>;

    async fn record_review(
        &self,
        card_id: CardId,
        grade: ReviewGrade,
    ) -> Result<ReviewRecord, RepoError>;

    async fn list_settings(&self) -> Result<Vec<SettingRecord>, RepoError>;

    /// A setting that was never written is returned with `value: None`.
    async fn find_setting(&self, name: &str) -> Result<SettingRecord, RepoError>;

    async fn write_setting(
        &self,
        name: &str,
        value: Option<&str>,
    ) -> Result<SettingRecord, RepoError>;
}
