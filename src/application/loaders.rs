//! Route-level prefetching.
//!
//! Before a route renders, its loader ensures every query the view under it
//! will read. Loader and view build the same [`Query`] descriptors, so the
//! view finds the prefetched entries instead of fetching again.

use std::fmt;
use std::str::FromStr;

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::application::queries::Queries;
use crate::cache::{CacheError, Query, QueryClient};
use crate::domain::entities::{AlgorithmId, CardId, DeckId, TemplateId};
use crate::keys::QueryKey;
use crate::keys::lessons::{LessonFilters, LessonKind};

/// Every screen of the study client that prefetches data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Decks,
    Deck { deck_id: DeckId, page: Option<u32> },
    Algorithm { algorithm_id: AlgorithmId },
    Template { template_id: TemplateId },
    Lessons { filters: LessonFilters },
    Lesson { deck_id: DeckId, kind: LessonKind },
    CardReviews { card_id: CardId },
    Settings,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Decks => f.write_str("/decks"),
            Route::Deck { deck_id, page } => match page {
                Some(page) => write!(f, "/decks/{deck_id}?page={page}"),
                None => write!(f, "/decks/{deck_id}"),
            },
            Route::Algorithm { algorithm_id } => write!(f, "/algorithms/{algorithm_id}"),
            Route::Template { template_id } => write!(f, "/templates/{template_id}"),
            Route::Lessons { .. } => f.write_str("/lessons"),
            Route::Lesson { deck_id, kind } => write!(f, "/lessons/{deck_id}/{kind}"),
            Route::CardReviews { card_id } => write!(f, "/cards/{card_id}/reviews"),
            Route::Settings => f.write_str("/settings"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised route `{0}`")]
pub struct ParseRouteError(String);

impl FromStr for Route {
    type Err = ParseRouteError;

    /// Parse the path form produced by `Display`. Lesson filters are not
    /// encoded in the path, so `/lessons` always parses unfiltered.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRouteError(value.to_string());
        let (path, query) = value.split_once('?').unwrap_or((value, ""));
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        let id = |raw: &str| raw.parse::<i64>().map_err(|_| invalid());
        match segments.as_slice() {
            ["decks"] => Ok(Route::Decks),
            ["decks", deck_id] => {
                let page = match query.strip_prefix("page=") {
                    Some(page) => Some(page.parse::<u32>().map_err(|_| invalid())?),
                    None if query.is_empty() => None,
                    None => return Err(invalid()),
                };
                Ok(Route::Deck {
                    deck_id: id(deck_id)?,
                    page,
                })
            }
            ["algorithms", algorithm_id] => Ok(Route::Algorithm {
                algorithm_id: id(algorithm_id)?,
            }),
            ["templates", template_id] => Ok(Route::Template {
                template_id: id(template_id)?,
            }),
            ["lessons"] => Ok(Route::Lessons {
                filters: LessonFilters::default(),
            }),
            ["lessons", deck_id, kind] => {
                let kind = kind.parse::<LessonKind>().map_err(|_| invalid())?;
                Ok(Route::Lesson {
                    deck_id: id(deck_id)?,
                    kind,
                })
            }
            ["cards", card_id, "reviews"] => Ok(Route::CardReviews {
                card_id: id(card_id)?,
            }),
            ["settings"] => Ok(Route::Settings),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to load `{key}` for route {route}")]
pub struct LoaderError {
    pub route: String,
    pub key: String,
    #[source]
    pub source: CacheError,
}

/// Keys a route load left in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRoute {
    pub route: Route,
    pub keys: Vec<QueryKey>,
}

#[derive(Clone)]
pub struct RouteLoader {
    client: QueryClient,
    queries: Queries,
}

type Prefetch<'a> = BoxFuture<'a, Result<QueryKey, LoaderError>>;

impl RouteLoader {
    pub fn new(client: QueryClient, queries: Queries) -> Self {
        Self { client, queries }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    /// Ensure every query of `route`, concurrently. Fails on the first
    /// query that fails.
    #[instrument(skip(self), fields(route = %route))]
    pub async fn load(&self, route: &Route) -> Result<LoadedRoute, LoaderError> {
        let queries = &self.queries;
        let prefetches: Vec<Prefetch<'_>> = match route {
            Route::Decks => vec![self.prefetch(route, queries.decks())],
            Route::Deck { deck_id, page } => vec![
                self.prefetch(route, queries.deck(*deck_id)),
                self.prefetch(route, queries.card_page(*deck_id, *page, None)),
                self.prefetch(route, queries.card_count(*deck_id)),
            ],
            Route::Algorithm { algorithm_id } => vec![
                self.prefetch(route, queries.algorithm(*algorithm_id)),
                self.prefetch(route, queries.algorithm_decks(*algorithm_id)),
            ],
            Route::Template { template_id } => vec![
                self.prefetch(route, queries.template(*template_id)),
                self.prefetch(route, queries.template_decks(*template_id)),
            ],
            Route::Lessons { filters } => vec![
                self.prefetch(route, queries.lessons(filters.clone())),
                self.prefetch(route, queries.today_review_totals()),
            ],
            Route::Lesson { deck_id, kind } => vec![
                self.prefetch(route, queries.lesson_data(*deck_id, *kind)),
                self.prefetch(route, queries.today_review_totals()),
            ],
            Route::CardReviews { card_id } => vec![
                self.prefetch(route, queries.card(*card_id)),
                self.prefetch(route, queries.reviews(*card_id)),
            ],
            Route::Settings => vec![self.prefetch(route, queries.settings())],
        };

        let keys = try_join_all(prefetches).await?;
        debug!(loaded = keys.len(), "route prefetched");
        Ok(LoadedRoute {
            route: route.clone(),
            keys,
        })
    }

    fn prefetch<'a, Q: Query>(&'a self, route: &'a Route, query: Q) -> Prefetch<'a> {
        async move {
            let key = query.key();
            match self.client.ensure_query(&query).await {
                Ok(_) => Ok(key),
                Err(source) => Err(LoaderError {
                    route: route.to_string(),
                    key: key.to_string(),
                    source,
                }),
            }
        }
        .boxed()
    }
}
