//! Route loaders prefetch exactly what the views under them read.

use std::sync::Arc;
use std::time::Duration;

use recollect::application::loaders::{Route, RouteLoader};
use recollect::application::queries::Queries;
use recollect::cache::QueryClient;
use recollect::infra::memory::MemoryStudyRepository;
use recollect::keys::lessons::{LessonKind, LessonParams};
use recollect::keys::{cards, decks, lessons};

fn loader(latency: Duration) -> (Arc<MemoryStudyRepository>, RouteLoader) {
    let repo = Arc::new(MemoryStudyRepository::seeded().with_latency(latency));
    let loader = RouteLoader::new(QueryClient::default(), Queries::new(repo.clone()));
    (repo, loader)
}

#[tokio::test]
async fn view_after_loader_does_not_fetch_again() {
    let (repo, loader) = loader(Duration::ZERO);
    let route = Route::Deck {
        deck_id: 3,
        page: None,
    };

    let loaded = loader.load(&route).await.expect("route loads");
    assert_eq!(
        loaded.keys,
        vec![
            decks::detail(3),
            cards::paginated(&cards::CardPageParams::new(3)),
            cards::count(3),
        ]
    );

    let client = loader.client();
    let queries = loader.queries();
    let deck = client.ensure_query(&queries.deck(3)).await.expect("deck");
    let page = client
        .ensure_query(&queries.card_page(3, None, None))
        .await
        .expect("page");
    let count = client
        .ensure_query(&queries.card_count(3))
        .await
        .expect("count");

    assert_eq!(deck.name, "Japanese vocabulary");
    assert_eq!(page.cards.len(), 3);
    assert_eq!(*count, 3);
    for op in ["find_deck", "list_cards", "count_cards"] {
        assert_eq!(repo.call_count(op), 1, "{op} called more than once");
    }
}

#[tokio::test]
async fn concurrent_loads_of_one_route_coalesce() {
    let (repo, loader) = loader(Duration::from_millis(20));
    let route = Route::Lesson {
        deck_id: 3,
        kind: LessonKind::Review,
    };

    let (first, second) = tokio::join!(loader.load(&route), loader.load(&route));
    let first = first.expect("first load");
    second.expect("second load");

    assert_eq!(
        first.keys,
        vec![
            lessons::data(&LessonParams::new(3, LessonKind::Review)),
            lessons::today_review_totals(),
        ]
    );
    assert_eq!(repo.call_count("lesson_data"), 1);
    assert_eq!(repo.call_count("today_review_totals"), 1);
}

#[tokio::test]
async fn failed_prefetch_sticks_until_invalidated() {
    let (repo, loader) = loader(Duration::ZERO);
    let route = Route::Deck {
        deck_id: 3,
        page: None,
    };
    repo.fail_next("find_deck", "replica lagging");

    let err = loader.load(&route).await.expect_err("deck fetch fails");
    assert_eq!(err.route, "/decks/3");
    assert_eq!(err.key, "[decks, 3]");
    assert_eq!(
        err.to_string(),
        "failed to load `[decks, 3]` for route /decks/3"
    );

    loader.load(&route).await.expect_err("failure is cached");
    assert_eq!(repo.call_count("find_deck"), 1);

    loader.client().invalidate(&decks::detail(3));
    loader.load(&route).await.expect("refetch succeeds");
    assert_eq!(repo.call_count("find_deck"), 2);
}

#[tokio::test]
async fn missing_entities_surface_as_loader_errors() {
    let (_repo, loader) = loader(Duration::ZERO);
    let err = loader
        .load(&Route::Algorithm { algorithm_id: 99 })
        .await
        .expect_err("no such algorithm");
    assert_eq!(err.key, "[algorithms, 99]");
}

#[tokio::test]
async fn every_route_loads_against_seeded_data() {
    let (_repo, loader) = loader(Duration::ZERO);
    let routes = [
        "/decks",
        "/decks/4?page=0",
        "/algorithms/1",
        "/templates/2",
        "/lessons",
        "/lessons/4/new",
        "/cards/5/reviews",
        "/settings",
    ];
    for path in routes {
        let route: Route = path.parse().expect("route parses");
        let loaded = loader.load(&route).await.expect("route loads");
        assert!(!loaded.keys.is_empty(), "{path} loaded nothing");
        for key in &loaded.keys {
            let state = loader.client().entry_state(key).expect("entry stored");
            assert!(!state.stale && !state.failed, "{path}: {key} not fresh");
        }
    }
}
