//! Query descriptors for every cached study query.
//!
//! A descriptor pairs a key builder with the repository call that produces
//! the value, so the route loader and the view under that route always
//! agree on the key. Build them through [`Queries`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::repos::{RepoError, StudyRepository};
use crate::cache::Query;
use crate::domain::entities::{
    AlgorithmId, AlgorithmRecord, CardId, CardPage, CardRecord, DeckId, DeckRecord, LessonData,
    LessonSummary, ReviewRecord, ReviewTotals, SettingRecord, TemplateId, TemplateRecord,
};
use crate::keys::cards::{CardPageParams, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use crate::keys::lessons::{LessonFilters, LessonKind, LessonParams};
use crate::keys::{self, QueryKey};

type Repo = Arc<dyn StudyRepository>;

/// Factory for query descriptors over one repository.
#[derive(Clone)]
pub struct Queries {
    repo: Repo,
}

impl Queries {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn algorithms(&self) -> AlgorithmsQuery {
        AlgorithmsQuery {
            repo: Arc::clone(&self.repo),
        }
    }

    pub fn algorithm(&self, id: AlgorithmId) -> AlgorithmQuery {
        AlgorithmQuery {
            repo: Arc::clone(&self.repo),
            id,
        }
    }

    pub fn algorithm_decks(&self, id: AlgorithmId) -> AlgorithmDecksQuery {
        AlgorithmDecksQuery {
            repo: Arc::clone(&self.repo),
            id,
        }
    }

    pub fn templates(&self) -> TemplatesQuery {
        TemplatesQuery {
            repo: Arc::clone(&self.repo),
        }
    }

    pub fn template(&self, id: TemplateId) -> TemplateQuery {
        TemplateQuery {
            repo: Arc::clone(&self.repo),
            id,
        }
    }

    pub fn template_decks(&self, id: TemplateId) -> TemplateDecksQuery {
        TemplateDecksQuery {
            repo: Arc::clone(&self.repo),
            id,
        }
    }

    pub fn decks(&self) -> DecksQuery {
        DecksQuery {
            repo: Arc::clone(&self.repo),
        }
    }

    pub fn deck(&self, id: DeckId) -> DeckQuery {
        DeckQuery {
            repo: Arc::clone(&self.repo),
            id,
        }
    }

    /// A page of a deck's cards; `None` picks the default page or size.
    pub fn card_page(
        &self,
        deck_id: DeckId,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> CardPageQuery {
        CardPageQuery {
            repo: Arc::clone(&self.repo),
            deck_id,
            page: page.unwrap_or(DEFAULT_PAGE),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn card(&self, id: CardId) -> CardQuery {
        CardQuery {
            repo: Arc::clone(&self.repo),
            id,
        }
    }

    pub fn card_count(&self, deck_id: DeckId) -> CardCountQuery {
        CardCountQuery {
            repo: Arc::clone(&self.repo),
            deck_id,
        }
    }

    pub fn lessons(&self, filters: LessonFilters) -> LessonsQuery {
        LessonsQuery {
            repo: Arc::clone(&self.repo),
            filters,
        }
    }

    pub fn lesson_data(&self, deck_id: DeckId, kind: LessonKind) -> LessonDataQuery {
        LessonDataQuery {
            repo: Arc::clone(&self.repo),
            deck_id,
            kind,
        }
    }

    pub fn today_review_totals(&self) -> TodayReviewTotalsQuery {
        TodayReviewTotalsQuery {
            repo: Arc::clone(&self.repo),
        }
    }

    pub fn reviews(&self, card_id: CardId) -> ReviewsQuery {
        ReviewsQuery {
            repo: Arc::clone(&self.repo),
            card_id,
        }
    }

    pub fn settings(&self) -> SettingsQuery {
        SettingsQuery {
            repo: Arc::clone(&self.repo),
        }
    }

    pub fn setting(&self, name: impl Into<String>) -> SettingQuery {
        SettingQuery {
            repo: Arc::clone(&self.repo),
            name: name.into(),
        }
    }
}

// ============================================================================
// Algorithms and templates
// ============================================================================

#[derive(Clone)]
pub struct AlgorithmsQuery {
    repo: Repo,
}

#[async_trait]
impl Query for AlgorithmsQuery {
    type Output = Vec<AlgorithmRecord>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::algorithms::all()
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_algorithms().await
    }
}

#[derive(Clone)]
pub struct AlgorithmQuery {
    repo: Repo,
    pub id: AlgorithmId,
}

#[async_trait]
impl Query for AlgorithmQuery {
    type Output = AlgorithmRecord;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::algorithms::detail(self.id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.find_algorithm(self.id).await
    }
}

#[derive(Clone)]
pub struct AlgorithmDecksQuery {
    repo: Repo,
    pub id: AlgorithmId,
}

#[async_trait]
impl Query for AlgorithmDecksQuery {
    type Output = Vec<DeckRecord>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::algorithms::decks(self.id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_algorithm_decks(self.id).await
    }
}

#[derive(Clone)]
pub struct TemplatesQuery {
    repo: Repo,
}

#[async_trait]
impl Query for TemplatesQuery {
    type Output = Vec<TemplateRecord>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::templates::all()
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_templates().await
    }
}

#[derive(Clone)]
pub struct TemplateQuery {
    repo: Repo,
    pub id: TemplateId,
}

#[async_trait]
impl Query for TemplateQuery {
    type Output = TemplateRecord;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::templates::detail(self.id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.find_template(self.id).await
    }
}

#[derive(Clone)]
pub struct TemplateDecksQuery {
    repo: Repo,
    pub id: TemplateId,
}

#[async_trait]
impl Query for TemplateDecksQuery {
    type Output = Vec<DeckRecord>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::templates::decks(self.id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_template_decks(self.id).await
    }
}

// ============================================================================
// Decks and cards
// ============================================================================

#[derive(Clone)]
pub struct DecksQuery {
    repo: Repo,
}

#[async_trait]
impl Query for DecksQuery {
    type Output = Vec<DeckRecord>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::decks::all()
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_decks().await
    }
}

#[derive(Clone)]
pub struct DeckQuery {
    repo: Repo,
    pub id: DeckId,
}

#[async_trait]
impl Query for DeckQuery {
    type Output = DeckRecord;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::decks::detail(self.id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.find_deck(self.id).await
    }
}

/// Page and size are resolved when the descriptor is built, so the key and
/// the repository call always see the same values.
#[derive(Clone)]
pub struct CardPageQuery {
    repo: Repo,
    pub deck_id: DeckId,
    pub page: u32,
    pub page_size: u32,
}

#[async_trait]
impl Query for CardPageQuery {
    type Output = CardPage;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::cards::paginated(
            &CardPageParams::new(self.deck_id)
                .page(self.page)
                .page_size(self.page_size),
        )
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo
            .list_cards(self.deck_id, self.page, self.page_size)
            .await
    }
}

#[derive(Clone)]
pub struct CardQuery {
    repo: Repo,
    pub id: CardId,
}

#[async_trait]
impl Query for CardQuery {
    type Output = CardRecord;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::cards::detail(self.id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.find_card(self.id).await
    }
}

#[derive(Clone)]
pub struct CardCountQuery {
    repo: Repo,
    pub deck_id: DeckId,
}

#[async_trait]
impl Query for CardCountQuery {
    type Output = u64;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::cards::count(self.deck_id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.count_cards(self.deck_id).await
    }
}

// ============================================================================
// Study
// ============================================================================

#[derive(Clone)]
pub struct LessonsQuery {
    repo: Repo,
    pub filters: LessonFilters,
}

#[async_trait]
impl Query for LessonsQuery {
    type Output = Vec<LessonSummary>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::lessons::list(&self.filters)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_lessons(&self.filters).await
    }
}

#[derive(Clone)]
pub struct LessonDataQuery {
    repo: Repo,
    pub deck_id: DeckId,
    pub kind: LessonKind,
}

#[async_trait]
impl Query for LessonDataQuery {
    type Output = LessonData;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::lessons::data(&LessonParams::new(self.deck_id, self.kind))
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.lesson_data(self.deck_id, self.kind).await
    }
}

#[derive(Clone)]
pub struct TodayReviewTotalsQuery {
    repo: Repo,
}

#[async_trait]
impl Query for TodayReviewTotalsQuery {
    type Output = ReviewTotals;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::lessons::today_review_totals()
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.today_review_totals().await
    }
}

#[derive(Clone)]
pub struct ReviewsQuery {
    repo: Repo,
    pub card_id: CardId,
}

#[async_trait]
impl Query for ReviewsQuery {
    type Output = Vec<ReviewRecord>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::reviews::card(self.card_id)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_reviews(self.card_id).await
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Clone)]
pub struct SettingsQuery {
    repo: Repo,
}

#[async_trait]
impl Query for SettingsQuery {
    type Output = Vec<SettingRecord>;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::settings::all()
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.list_settings().await
    }
}

#[derive(Clone)]
pub struct SettingQuery {
    repo: Repo,
    pub name: String,
}

#[async_trait]
impl Query for SettingQuery {
    type Output = SettingRecord;
    type Error = RepoError;

    fn key(&self) -> QueryKey {
        keys::settings::detail(&self.name)
    }

    async fn fetch(&self) -> Result<Self::Output, RepoError> {
        self.repo.find_setting(&self.name).await
    }
}
