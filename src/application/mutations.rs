//! Write operations and their cache consequences.
//!
//! Every mutation writes through the repository, applies the invalidation
//! plan of the resulting [`MutationEvent`]s, and then stores the returned
//! record under its detail key so the next read does not refetch it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::application::render::markdown;
use crate::application::repos::{CardContent, RepoError, StudyRepository};
use crate::cache::{InvalidationPlan, MutationEvent, QueryClient};
use crate::domain::entities::{
    CardId, CardRecord, DeckId, DeckRecord, DeckUpdate, NewCard, ReviewRecord, SettingRecord,
};
use crate::domain::error::DomainError;
use crate::domain::types::ReviewGrade;
use crate::keys::{self, EntityId};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct StudyMutations {
    repo: Arc<dyn StudyRepository>,
    client: QueryClient,
}

impl StudyMutations {
    pub fn new(repo: Arc<dyn StudyRepository>, client: QueryClient) -> Self {
        Self { repo, client }
    }

    fn apply(&self, events: &[MutationEvent]) -> usize {
        let plan = InvalidationPlan::from_events(events);
        let staled = self.client.apply(&plan);
        info!(plan = %plan, staled, "applied invalidation plan");
        staled
    }

    #[instrument(skip(self, card), fields(deck_id = card.deck_id))]
    pub async fn create_card(&self, card: NewCard) -> Result<CardRecord, MutationError> {
        validate_faces(&card.front_markdown, &card.back_markdown)?;
        let record = self.repo.create_card(card).await?;
        self.apply(&[MutationEvent::CardsCreated {
            deck_id: EntityId::from(record.deck_id),
        }]);
        self.client
            .set_data(&keys::cards::detail(record.id), record.clone());
        Ok(record)
    }

    #[instrument(skip(self, content))]
    pub async fn update_card(
        &self,
        id: CardId,
        content: CardContent,
    ) -> Result<CardRecord, MutationError> {
        validate_faces(&content.front_markdown, &content.back_markdown)?;
        let record = self.repo.update_card(id, content).await?;
        self.apply(&[MutationEvent::CardUpdated {
            card_id: EntityId::from(record.id),
            deck_id: EntityId::from(record.deck_id),
        }]);
        self.client
            .set_data(&keys::cards::detail(record.id), record.clone());
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete_card(&self, id: CardId) -> Result<CardRecord, MutationError> {
        let record = self.repo.delete_card(id).await?;
        self.apply(&[MutationEvent::CardDeleted {
            card_id: EntityId::from(record.id),
            deck_id: EntityId::from(record.deck_id),
        }]);
        Ok(record)
    }

    /// Update a deck. When it moves to another algorithm or template, the
    /// old owners' deck listings are staled too.
    #[instrument(skip(self, update))]
    pub async fn update_deck(
        &self,
        id: DeckId,
        update: DeckUpdate,
    ) -> Result<DeckRecord, MutationError> {
        let previous = self.repo.find_deck(id).await?;
        let record = self.repo.update_deck(id, update).await?;

        let mut events = vec![MutationEvent::DeckUpserted {
            deck_id: EntityId::from(record.id),
            algorithm_id: EntityId::from(record.algorithm_id),
            template_id: EntityId::from(record.template_id),
        }];
        if (previous.algorithm_id, previous.template_id) != (record.algorithm_id, record.template_id)
        {
            events.push(MutationEvent::DeckUpserted {
                deck_id: EntityId::from(previous.id),
                algorithm_id: EntityId::from(previous.algorithm_id),
                template_id: EntityId::from(previous.template_id),
            });
        }
        self.apply(&events);
        self.client
            .set_data(&keys::decks::detail(record.id), record.clone());
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn record_review(
        &self,
        card_id: CardId,
        grade: ReviewGrade,
    ) -> Result<ReviewRecord, MutationError> {
        let card = self.repo.find_card(card_id).await?;
        let review = self.repo.record_review(card_id, grade).await?;
        self.apply(&[MutationEvent::ReviewRecorded {
            card_id: EntityId::from(card.id),
            deck_id: EntityId::from(card.deck_id),
        }]);
        Ok(review)
    }

    #[instrument(skip(self))]
    pub async fn write_setting(
        &self,
        name: &str,
        value: Option<&str>,
    ) -> Result<SettingRecord, MutationError> {
        let record = self.repo.write_setting(name, value).await?;
        self.apply(&[MutationEvent::SettingChanged {
            name: name.to_string(),
        }]);
        self.client
            .set_data(&keys::settings::detail(name), record.clone());
        Ok(record)
    }
}

fn validate_faces(front: &str, back: &str) -> Result<(), DomainError> {
    let renderer = markdown();
    if renderer.is_empty(front) {
        return Err(DomainError::EmptyCardSide { side: "front" });
    }
    if renderer.is_empty(back) {
        return Err(DomainError::EmptyCardSide { side: "back" });
    }
    Ok(())
}
