//! Invalidation plan generation.
//!
//! Maps mutation events to the key prefixes that must be invalidated. This
//! is the one place the dependency graph between entities is written down:
//! decks hang off algorithms and templates, cards off decks, reviews off
//! cards, and lessons aggregate all of them.

use std::fmt;

use crate::keys::{self, QueryKey};

use super::events::MutationEvent;

/// Key prefixes to invalidate after one or more mutations.
///
/// Prefixes are deduplicated, and a prefix already covered by a shorter one
/// in the plan is dropped, so every stored entry is visited at most once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    prefixes: Vec<QueryKey>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvalidationPlan {")?;
        for (index, prefix) in self.prefixes.iter().enumerate() {
            f.write_str(if index == 0 { " " } else { ", " })?;
            prefix.fmt(f)?;
        }
        f.write_str(" }")
    }
}

impl InvalidationPlan {
    pub fn from_event(event: &MutationEvent) -> Self {
        Self::from_events(std::slice::from_ref(event))
    }

    /// Merge the prefixes of several events into a single plan.
    pub fn from_events(events: &[MutationEvent]) -> Self {
        let mut plan = Self::default();
        for event in events {
            for prefix in prefixes_for(event) {
                plan.insert(prefix);
            }
        }
        plan
    }

    /// Add a prefix unless the plan already covers it.
    pub fn insert(&mut self, prefix: QueryKey) {
        if self.covers(&prefix) {
            return;
        }
        self.prefixes.retain(|existing| !existing.starts_with(&prefix));
        self.prefixes.push(prefix);
    }

    /// True when invalidating this plan stales `key`.
    pub fn covers(&self, key: &QueryKey) -> bool {
        self.prefixes.iter().any(|prefix| key.starts_with(prefix))
    }

    pub fn prefixes(&self) -> &[QueryKey] {
        &self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

fn lesson_prefixes() -> [QueryKey; 3] {
    [
        keys::lessons::all(),
        keys::lessons::all_data(),
        keys::lessons::today_review_totals(),
    ]
}

fn prefixes_for(event: &MutationEvent) -> Vec<QueryKey> {
    use keys::{algorithms, cards, decks, reviews, settings, templates};

    match event {
        MutationEvent::AlgorithmUpserted { algorithm_id } => vec![
            algorithms::all(),
            algorithms::decks(algorithm_id),
            keys::lessons::all(),
        ],
        MutationEvent::TemplateUpserted { template_id } => {
            vec![templates::all(), templates::decks(template_id)]
        }
        MutationEvent::DeckUpserted {
            algorithm_id,
            template_id,
            ..
        } => {
            let mut prefixes = vec![
                decks::all(),
                algorithms::decks(algorithm_id),
                templates::decks(template_id),
            ];
            prefixes.extend(lesson_prefixes());
            prefixes
        }
        MutationEvent::DeckDeleted {
            deck_id,
            algorithm_id,
            template_id,
        } => {
            let mut prefixes = vec![
                decks::all(),
                algorithms::decks(algorithm_id),
                templates::decks(template_id),
                cards::deck(deck_id),
                cards::count(deck_id),
            ];
            prefixes.extend(lesson_prefixes());
            prefixes
        }
        // `cards_count` is its own namespace: stale it alongside the deck's
        // card listings.
        MutationEvent::CardsCreated { deck_id } => {
            let mut prefixes = vec![cards::deck(deck_id), cards::count(deck_id)];
            prefixes.extend(lesson_prefixes());
            prefixes
        }
        // Lesson data carries full card faces; the count and totals are
        // unaffected by an edit.
        MutationEvent::CardUpdated { card_id, deck_id } => vec![
            cards::detail(card_id),
            cards::deck(deck_id),
            keys::lessons::all_data(),
        ],
        MutationEvent::CardDeleted { card_id, deck_id } => {
            let mut prefixes = vec![
                cards::detail(card_id),
                cards::deck(deck_id),
                cards::count(deck_id),
                reviews::card(card_id),
            ];
            prefixes.extend(lesson_prefixes());
            prefixes
        }
        MutationEvent::ReviewRecorded { card_id, deck_id } => {
            let mut prefixes = vec![
                reviews::card(card_id),
                cards::detail(card_id),
                cards::deck(deck_id),
            ];
            prefixes.extend(lesson_prefixes());
            prefixes
        }
        MutationEvent::SettingChanged { .. } => vec![settings::all()],
    }
}
