//! Mutations stale exactly the keys their invalidation plans name.

use std::sync::Arc;

use recollect::application::motion::{FixedMotionSignal, MotionSetting, motion_preferences};
use recollect::application::mutations::{MutationError, StudyMutations};
use recollect::application::queries::Queries;
use recollect::application::repos::CardContent;
use recollect::cache::QueryClient;
use recollect::domain::entities::{CardRecord, DeckRecord, DeckUpdate, NewCard, SettingRecord};
use recollect::domain::error::DomainError;
use recollect::domain::types::ReviewGrade;
use recollect::infra::memory::MemoryStudyRepository;
use recollect::keys::lessons::{LessonFilters, LessonKind, LessonParams};
use recollect::keys::settings::REDUCE_MOTION;
use recollect::keys::{QueryKey, algorithms, cards, decks, lessons, reviews, settings, templates};

struct Harness {
    repo: Arc<MemoryStudyRepository>,
    client: QueryClient,
    queries: Queries,
    mutations: StudyMutations,
}

impl Harness {
    fn new() -> Self {
        let repo = Arc::new(MemoryStudyRepository::seeded());
        let client = QueryClient::default();
        let queries = Queries::new(repo.clone());
        let mutations = StudyMutations::new(repo.clone(), client.clone());
        Self {
            repo,
            client,
            queries,
            mutations,
        }
    }

    /// Populate the cache the way the deck screen and lesson list would.
    async fn warm(&self) {
        let q = &self.queries;
        let c = &self.client;
        c.ensure_query(&q.decks()).await.expect("decks");
        c.ensure_query(&q.deck(3)).await.expect("deck");
        c.ensure_query(&q.card_page(3, None, None)).await.expect("page");
        c.ensure_query(&q.card_count(3)).await.expect("count");
        c.ensure_query(&q.card(5)).await.expect("card");
        c.ensure_query(&q.reviews(5)).await.expect("reviews");
        c.ensure_query(&q.lessons(LessonFilters::new())).await.expect("lessons");
        c.ensure_query(&q.today_review_totals()).await.expect("totals");
        c.ensure_query(&q.lesson_data(3, LessonKind::New))
            .await
            .expect("lesson data");
        c.ensure_query(&q.algorithm_decks(1)).await.expect("algorithm decks");
        c.ensure_query(&q.template_decks(2)).await.expect("template decks");
        c.ensure_query(&q.settings()).await.expect("settings");
    }

    fn stale(&self, key: &QueryKey) -> bool {
        self.client
            .entry_state(key)
            .unwrap_or_else(|| panic!("{key} was never cached"))
            .stale
    }
}

fn page_key(deck_id: i64) -> QueryKey {
    cards::paginated(&cards::CardPageParams::new(deck_id))
}

#[tokio::test]
async fn creating_a_card_stales_listing_count_and_lessons() {
    let h = Harness::new();
    h.warm().await;

    let record = h
        .mutations
        .create_card(NewCard {
            deck_id: 3,
            front_markdown: "**魚**".to_string(),
            back_markdown: "fish".to_string(),
            tags: vec!["animals".to_string()],
        })
        .await
        .expect("card created");

    assert!(h.stale(&page_key(3)));
    assert!(h.stale(&cards::count(3)));
    assert!(h.stale(&lessons::list(&LessonFilters::new())));
    assert!(h.stale(&lessons::today_review_totals()));
    assert!(!h.stale(&decks::detail(3)));
    assert!(!h.stale(&decks::all()));

    let cached = h
        .client
        .peek::<CardRecord>(&cards::detail(record.id))
        .expect("no stored error")
        .expect("written through");
    assert!(cached.is_fresh());
    assert_eq!(*cached.value, record);

    let count = h
        .client
        .ensure_query(&h.queries.card_count(3))
        .await
        .expect("recount");
    assert_eq!(*count, 4);
    assert_eq!(h.repo.call_count("count_cards"), 2);
}

#[tokio::test]
async fn editing_a_card_stales_lesson_data_but_keeps_the_count() {
    let h = Harness::new();
    h.warm().await;

    h.mutations
        .update_card(
            5,
            CardContent {
                front_markdown: "**猫** (ねこ)".to_string(),
                back_markdown: "cat".to_string(),
                tags: Vec::new(),
            },
        )
        .await
        .expect("card updated");

    assert!(h.stale(&page_key(3)));
    assert!(h.stale(&lessons::data(&LessonParams::new(3, LessonKind::New))));
    assert!(!h.stale(&cards::count(3)));
    assert!(!h.stale(&lessons::today_review_totals()));
    assert!(!h.stale(&cards::detail(5)), "detail was written through");

    let lesson = h
        .client
        .ensure_query(&h.queries.lesson_data(3, LessonKind::New))
        .await
        .expect("lesson refetches");
    assert_eq!(lesson.cards[0].front_markdown, "**猫** (ねこ)");
    assert_eq!(h.repo.call_count("lesson_data"), 2);
}

#[tokio::test]
async fn blank_faces_never_reach_the_repository() {
    let h = Harness::new();

    let err = h
        .mutations
        .create_card(NewCard {
            deck_id: 3,
            front_markdown: "<!-- draft -->".to_string(),
            back_markdown: "fish".to_string(),
            tags: Vec::new(),
        })
        .await
        .expect_err("empty front");

    assert!(matches!(
        err,
        MutationError::Domain(DomainError::EmptyCardSide { side: "front" })
    ));
    assert_eq!(h.repo.call_count("create_card"), 0);
}

#[tokio::test]
async fn deleting_a_card_stales_its_history() {
    let h = Harness::new();
    h.warm().await;

    h.mutations.delete_card(5).await.expect("card deleted");

    assert!(h.stale(&cards::detail(5)));
    assert!(h.stale(&reviews::card(5)));
    assert!(h.stale(&cards::count(3)));
    assert!(h.stale(&lessons::list(&LessonFilters::new())));
}

#[tokio::test]
async fn reviewing_a_card_stales_lessons_and_history() {
    let h = Harness::new();
    h.warm().await;

    let review = h
        .mutations
        .record_review(5, ReviewGrade::Good)
        .await
        .expect("review recorded");
    assert_eq!(review.card_id, 5);

    assert!(h.stale(&reviews::card(5)));
    assert!(h.stale(&cards::detail(5)));
    assert!(h.stale(&page_key(3)));
    assert!(h.stale(&lessons::today_review_totals()));
    assert!(!h.stale(&cards::count(3)));

    let history = h
        .client
        .ensure_query(&h.queries.reviews(5))
        .await
        .expect("history refetches");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn updating_a_deck_reaches_its_owners() {
    let h = Harness::new();
    h.warm().await;

    let record = h
        .mutations
        .update_deck(
            3,
            DeckUpdate {
                name: "日本語".to_string(),
                description: None,
                algorithm_id: 1,
                template_id: 2,
            },
        )
        .await
        .expect("deck updated");

    assert!(h.stale(&decks::all()));
    assert!(h.stale(&algorithms::decks(1)));
    assert!(h.stale(&templates::decks(2)));
    assert!(h.stale(&lessons::list(&LessonFilters::new())));
    assert!(!h.stale(&page_key(3)));

    let cached = h
        .client
        .peek::<DeckRecord>(&decks::detail(3))
        .expect("no stored error")
        .expect("written through");
    assert!(cached.is_fresh());
    assert_eq!(*cached.value, record);
}

#[tokio::test]
async fn setting_write_updates_motion_preference() {
    let h = Harness::new();
    h.warm().await;
    let (writer, reader) = motion_preferences(
        MotionSetting::Unset,
        Arc::new(FixedMotionSignal(false)),
        h.client.clone(),
    );

    let record = h
        .mutations
        .write_setting(REDUCE_MOTION, Some("on"))
        .await
        .expect("setting written");
    assert!(h.stale(&settings::all()));

    assert!(writer.apply_record(&record).expect("valid value"));
    assert!(reader.reduce_motion());

    // The writer stales the detail key; the mutation had just written it.
    let detail = h
        .client
        .entry_state(&settings::detail(REDUCE_MOTION))
        .expect("written through");
    assert!(detail.stale);

    let refetched = h
        .client
        .ensure_query(&h.queries.setting(REDUCE_MOTION))
        .await
        .expect("setting refetches");
    assert_eq!(
        *refetched,
        SettingRecord {
            name: REDUCE_MOTION.to_string(),
            value: Some("on".to_string()),
            updated_at: record.updated_at,
        }
    );
}
