//! In-memory study repository.
//!
//! Backs the CLI demo commands and the integration tests. It keeps a
//! per-operation call journal and can be told to fail the next call of an
//! operation, which is how fetch errors are exercised end to end.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::application::repos::{CardContent, RepoError, StudyRepository};
use crate::domain::entities::{
    AlgorithmId, AlgorithmRecord, CardId, CardPage, CardRecord, DeckId, DeckRecord, DeckUpdate,
    LessonData, LessonSummary, NewCard, ReviewRecord, ReviewTotals, SettingRecord, TemplateId,
    TemplateRecord,
};
use crate::domain::types::{CardState, ReviewGrade};
use crate::keys::EntityId;
use crate::keys::lessons::{LessonFilters, LessonKind};

#[derive(Default)]
struct Store {
    algorithms: BTreeMap<AlgorithmId, AlgorithmRecord>,
    templates: BTreeMap<TemplateId, TemplateRecord>,
    decks: BTreeMap<DeckId, DeckRecord>,
    cards: BTreeMap<CardId, CardRecord>,
    reviews: Vec<ReviewRecord>,
    settings: BTreeMap<String, SettingRecord>,
    next_id: i64,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, String>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn deck(&self, id: DeckId) -> Result<&DeckRecord, RepoError> {
        self.decks
            .get(&id)
            .ok_or_else(|| RepoError::not_found("deck", id))
    }

    fn card_mut(&mut self, id: CardId) -> Result<&mut CardRecord, RepoError> {
        self.cards
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found("card", id))
    }

    fn decks_where(&self, keep: impl Fn(&DeckRecord) -> bool) -> Vec<DeckRecord> {
        self.decks.values().filter(|deck| keep(deck)).cloned().collect()
    }

    fn cards_in(&self, deck_id: DeckId) -> impl Iterator<Item = &CardRecord> {
        self.cards.values().filter(move |card| card.deck_id == deck_id)
    }

    fn insert_algorithm(&mut self, name: &str, now: OffsetDateTime) -> AlgorithmId {
        let id = self.next_id();
        self.algorithms.insert(
            id,
            AlgorithmRecord {
                id,
                name: name.to_string(),
                learning_steps: vec![1, 10],
                graduating_interval_days: 1,
                easy_interval_days: 4,
                starting_ease: 2500,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    fn insert_template(&mut self, name: &str, now: OffsetDateTime) -> TemplateId {
        let id = self.next_id();
        self.templates.insert(
            id,
            TemplateRecord {
                id,
                name: name.to_string(),
                front_markdown: "{{front}}".to_string(),
                back_markdown: "{{front}}\n\n---\n\n{{back}}".to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    fn insert_deck(
        &mut self,
        name: &str,
        algorithm_id: AlgorithmId,
        template_id: TemplateId,
        now: OffsetDateTime,
    ) -> DeckId {
        let id = self.next_id();
        self.decks.insert(
            id,
            DeckRecord {
                id,
                name: name.to_string(),
                description: None,
                algorithm_id,
                template_id,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    fn insert_card(
        &mut self,
        deck_id: DeckId,
        front: &str,
        back: &str,
        state: CardState,
        now: OffsetDateTime,
    ) -> CardRecord {
        let id = self.next_id();
        let due_at = match state {
            CardState::New => None,
            CardState::Learning | CardState::Review => Some(now),
        };
        let card = CardRecord {
            id,
            deck_id,
            front_markdown: front.to_string(),
            back_markdown: back.to_string(),
            tags: Vec::new(),
            state,
            due_at,
            created_at: now,
            updated_at: now,
        };
        self.cards.insert(id, card.clone());
        card
    }
}

fn matches_filter(filter: Option<&EntityId>, id: i64) -> bool {
    filter.is_none_or(|wanted| *wanted == EntityId::from(id))
}

fn end_of_day(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_time(time::Time::MIDNIGHT) + Duration::days(1)
}

/// [`StudyRepository`] kept entirely in memory.
#[derive(Default)]
pub struct MemoryStudyRepository {
    store: Mutex<Store>,
    latency: Option<StdDuration>,
}

impl MemoryStudyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository holding one algorithm, one template and two decks with
    /// a handful of cards in every scheduling state.
    pub fn seeded() -> Self {
        let repo = Self::new();
        if let Ok(mut store) = repo.store.lock() {
            let now = OffsetDateTime::now_utc();
            let algorithm = store.insert_algorithm("Default spacing", now);
            let template = store.insert_template("Basic", now);
            let vocabulary = store.insert_deck("Japanese vocabulary", algorithm, template, now);
            let traits = store.insert_deck("Rust traits", algorithm, template, now);

            store.insert_card(vocabulary, "**猫**", "cat", CardState::New, now);
            store.insert_card(vocabulary, "**犬**", "dog", CardState::Learning, now);
            store.insert_card(vocabulary, "**鳥**", "bird", CardState::Review, now);
            store.insert_card(traits, "`Send`", "Safe to move across threads", CardState::New, now);
            store.insert_card(
                traits,
                "`Sync`",
                "Safe to share references across threads",
                CardState::Review,
                now,
            );
        }
        repo
    }

    /// Delay every call by `latency` before it reaches the store.
    pub fn with_latency(mut self, latency: StdDuration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// How many times operation `op` (the trait method name) was called.
    pub fn call_count(&self, op: &str) -> usize {
        self.store
            .lock()
            .map(|store| store.calls.get(op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Make the next call of `op` fail with [`RepoError::Unavailable`].
    pub fn fail_next(&self, op: &'static str, message: impl Into<String>) {
        if let Ok(mut store) = self.store.lock() {
            store.failures.insert(op, message.into());
        }
    }

    async fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, Store>, RepoError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut store = self
            .store
            .lock()
            .map_err(|_| RepoError::unavailable("memory store lock poisoned"))?;
        *store.calls.entry(op).or_default() += 1;
        debug!(op, "memory repository call");
        if let Some(message) = store.failures.remove(op) {
            return Err(RepoError::Unavailable(message));
        }
        Ok(store)
    }
}

#[async_trait]
impl StudyRepository for MemoryStudyRepository {
    async fn list_algorithms(&self) -> Result<Vec<AlgorithmRecord>, RepoError> {
        let store = self.enter("list_algorithms").await?;
        Ok(store.algorithms.values().cloned().collect())
    }

    async fn find_algorithm(&self, id: AlgorithmId) -> Result<AlgorithmRecord, RepoError> {
        let store = self.enter("find_algorithm").await?;
        store
            .algorithms
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("algorithm", id))
    }

    async fn list_algorithm_decks(&self, id: AlgorithmId) -> Result<Vec<DeckRecord>, RepoError> {
        let store = self.enter("list_algorithm_decks").await?;
        Ok(store.decks_where(|deck| deck.algorithm_id == id))
    }

    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, RepoError> {
        let store = self.enter("list_templates").await?;
        Ok(store.templates.values().cloned().collect())
    }

    async fn find_template(&self, id: TemplateId) -> Result<TemplateRecord, RepoError> {
        let store = self.enter("find_template").await?;
        store
            .templates
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("template", id))
    }

    async fn list_template_decks(&self, id: TemplateId) -> Result<Vec<DeckRecord>, RepoError> {
        let store = self.enter("list_template_decks").await?;
        Ok(store.decks_where(|deck| deck.template_id == id))
    }

    async fn list_decks(&self) -> Result<Vec<DeckRecord>, RepoError> {
        let store = self.enter("list_decks").await?;
        Ok(store.decks.values().cloned().collect())
    }

    async fn find_deck(&self, id: DeckId) -> Result<DeckRecord, RepoError> {
        let store = self.enter("find_deck").await?;
        store.deck(id).cloned()
    }

    async fn update_deck(&self, id: DeckId, update: DeckUpdate) -> Result<DeckRecord, RepoError> {
        let mut store = self.enter("update_deck").await?;
        if !store.algorithms.contains_key(&update.algorithm_id) {
            return Err(RepoError::InvalidInput {
                message: format!("algorithm `{}` does not exist", update.algorithm_id),
            });
        }
        if !store.templates.contains_key(&update.template_id) {
            return Err(RepoError::InvalidInput {
                message: format!("template `{}` does not exist", update.template_id),
            });
        }
        let deck = store
            .decks
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found("deck", id))?;
        deck.name = update.name;
        deck.description = update.description;
        deck.algorithm_id = update.algorithm_id;
        deck.template_id = update.template_id;
        deck.updated_at = OffsetDateTime::now_utc();
        Ok(deck.clone())
    }

    async fn list_cards(
        &self,
        deck_id: DeckId,
        page: u32,
        page_size: u32,
    ) -> Result<CardPage, RepoError> {
        let store = self.enter("list_cards").await?;
        store.deck(deck_id)?;
        let total = store.cards_in(deck_id).count() as u64;
        let skip = page as usize * page_size as usize;
        let cards = store
            .cards_in(deck_id)
            .skip(skip)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(CardPage {
            deck_id,
            page,
            page_size,
            total,
            cards,
        })
    }

    async fn count_cards(&self, deck_id: DeckId) -> Result<u64, RepoError> {
        let store = self.enter("count_cards").await?;
        store.deck(deck_id)?;
        Ok(store.cards_in(deck_id).count() as u64)
    }

    async fn find_card(&self, id: CardId) -> Result<CardRecord, RepoError> {
        let store = self.enter("find_card").await?;
        store
            .cards
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("card", id))
    }

    async fn create_card(&self, card: NewCard) -> Result<CardRecord, RepoError> {
        let mut store = self.enter("create_card").await?;
        store.deck(card.deck_id)?;
        let mut record = store.insert_card(
            card.deck_id,
            &card.front_markdown,
            &card.back_markdown,
            CardState::New,
            OffsetDateTime::now_utc(),
        );
        record.tags = card.tags;
        store.cards.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_card(
        &self,
        id: CardId,
        content: CardContent,
    ) -> Result<CardRecord, RepoError> {
        let mut store = self.enter("update_card").await?;
        let card = store.card_mut(id)?;
        card.front_markdown = content.front_markdown;
        card.back_markdown = content.back_markdown;
        card.tags = content.tags;
        card.updated_at = OffsetDateTime::now_utc();
        Ok(card.clone())
    }

    async fn delete_card(&self, id: CardId) -> Result<CardRecord, RepoError> {
        let mut store = self.enter("delete_card").await?;
        let card = store
            .cards
            .remove(&id)
            .ok_or_else(|| RepoError::not_found("card", id))?;
        store.reviews.retain(|review| review.card_id != id);
        Ok(card)
    }

    async fn list_lessons(
        &self,
        filters: &LessonFilters,
    ) -> Result<Vec<LessonSummary>, RepoError> {
        let store = self.enter("list_lessons").await?;
        let due_only = filters.due_only.unwrap_or(false);
        let lessons = store
            .decks
            .values()
            .filter(|deck| {
                matches_filter(filters.deck_id.as_ref(), deck.id)
                    && matches_filter(filters.algorithm_id.as_ref(), deck.algorithm_id)
                    && matches_filter(filters.template_id.as_ref(), deck.template_id)
            })
            .map(|deck| {
                let mut summary = LessonSummary {
                    deck_id: deck.id,
                    deck_name: deck.name.clone(),
                    new_count: 0,
                    learn_count: 0,
                    review_count: 0,
                };
                for card in store.cards_in(deck.id) {
                    match card.state.lesson_kind() {
                        LessonKind::New => summary.new_count += 1,
                        LessonKind::Learn => summary.learn_count += 1,
                        LessonKind::Review => summary.review_count += 1,
                    }
                }
                summary
            })
            .filter(|summary| !due_only || summary.learn_count + summary.review_count > 0)
            .collect();
        Ok(lessons)
    }

    async fn lesson_data(
        &self,
        deck_id: DeckId,
        kind: LessonKind,
    ) -> Result<LessonData, RepoError> {
        let store = self.enter("lesson_data").await?;
        store.deck(deck_id)?;
        let cards = store
            .cards_in(deck_id)
            .filter(|card| card.state.lesson_kind() == kind)
            .cloned()
            .collect();
        Ok(LessonData {
            deck_id,
            kind,
            cards,
        })
    }

    async fn today_review_totals(&self) -> Result<ReviewTotals, RepoError> {
        let store = self.enter("today_review_totals").await?;
        let now = OffsetDateTime::now_utc();
        let today = now.date();
        let cutoff = end_of_day(now);
        let reviewed = store
            .reviews
            .iter()
            .filter(|review| review.reviewed_at.date() == today)
            .count() as u32;
        let due = store
            .cards
            .values()
            .filter(|card| card.due_at.is_some_and(|due_at| due_at < cutoff))
            .count() as u32;
        Ok(ReviewTotals { reviewed, due })
    }

    async fn list_reviews(&self, card_id: CardId) -> Result<Vec<ReviewRecord>, RepoError> {
        let store = self.enter("list_reviews").await?;
        Ok(store
            .reviews
            .iter()
            .filter(|review| review.card_id == card_id)
            .cloned()
            .collect())
    }

    async fn record_review(
        &self,
        card_id: CardId,
        grade: ReviewGrade,
    ) -> Result<ReviewRecord, RepoError> {
        let mut store = self.enter("record_review").await?;
        let deck_id = store
            .cards
            .get(&card_id)
            .map(|card| card.deck_id)
            .ok_or_else(|| RepoError::not_found("card", card_id))?;
        let algorithm_id = store.deck(deck_id)?.algorithm_id;
        let algorithm = store
            .algorithms
            .get(&algorithm_id)
            .ok_or_else(|| RepoError::not_found("algorithm", algorithm_id))?;
        let interval_days = match grade {
            ReviewGrade::Again => 0,
            ReviewGrade::Hard => 1,
            ReviewGrade::Good => algorithm.graduating_interval_days,
            ReviewGrade::Easy => algorithm.easy_interval_days,
        };

        let now = OffsetDateTime::now_utc();
        let card = store.card_mut(card_id)?;
        card.state = if grade.is_pass() {
            CardState::Review
        } else {
            CardState::Learning
        };
        card.due_at = Some(now + Duration::days(i64::from(interval_days)));
        card.updated_at = now;

        let review = ReviewRecord {
            id: store.next_id(),
            card_id,
            grade,
            interval_days,
            reviewed_at: now,
        };
        store.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_settings(&self) -> Result<Vec<SettingRecord>, RepoError> {
        let store = self.enter("list_settings").await?;
        Ok(store.settings.values().cloned().collect())
    }

    async fn find_setting(&self, name: &str) -> Result<SettingRecord, RepoError> {
        let store = self.enter("find_setting").await?;
        Ok(store
            .settings
            .get(name)
            .cloned()
            .unwrap_or_else(|| SettingRecord {
                name: name.to_string(),
                value: None,
                updated_at: None,
            }))
    }

    async fn write_setting(
        &self,
        name: &str,
        value: Option<&str>,
    ) -> Result<SettingRecord, RepoError> {
        let mut store = self.enter("write_setting").await?;
        let record = SettingRecord {
            name: name.to_string(),
            value: value.map(str::to_string),
            updated_at: Some(OffsetDateTime::now_utc()),
        };
        store.settings.insert(name.to_string(), record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_store_has_two_decks() {
        let repo = MemoryStudyRepository::seeded();
        let decks = repo.list_decks().await.unwrap();
        assert_eq!(decks.len(), 2);
        assert_eq!(repo.count_cards(decks[0].id).await.unwrap(), 3);
        assert_eq!(repo.call_count("list_decks"), 1);
    }

    #[tokio::test]
    async fn injected_failure_hits_once() {
        let repo = MemoryStudyRepository::seeded();
        repo.fail_next("list_decks", "disk on fire");

        let err = repo.list_decks().await.unwrap_err();
        assert_eq!(err.to_string(), "study data source unavailable: disk on fire");
        assert!(repo.list_decks().await.is_ok());
        assert_eq!(repo.call_count("list_decks"), 2);
    }

    #[tokio::test]
    async fn paging_skips_whole_pages() {
        let repo = MemoryStudyRepository::seeded();
        let deck = repo.list_decks().await.unwrap()[0].id;

        let page = repo.list_cards(deck, 1, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.cards.len(), 1);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn failing_review_moves_card_to_learning() {
        let repo = MemoryStudyRepository::seeded();
        let deck = repo.list_decks().await.unwrap()[0].id;
        let review_card = repo
            .lesson_data(deck, LessonKind::Review)
            .await
            .unwrap()
            .cards[0]
            .id;

        let review = repo.record_review(review_card, ReviewGrade::Again).await.unwrap();
        assert_eq!(review.interval_days, 0);
        assert_eq!(
            repo.find_card(review_card).await.unwrap().state,
            CardState::Learning
        );
        assert_eq!(repo.today_review_totals().await.unwrap().reviewed, 1);
    }

    #[tokio::test]
    async fn lesson_filters_match_by_canonical_id() {
        let repo = MemoryStudyRepository::seeded();
        let deck = repo.list_decks().await.unwrap()[1].id;

        let lessons = repo
            .list_lessons(&LessonFilters::new().deck(deck.to_string()))
            .await
            .unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].deck_name, "Rust traits");
        assert_eq!(lessons[0].count(LessonKind::New), 1);
    }
}
