//! Mutation events.
//!
//! Every write the application performs is described by one event. The
//! planner turns events into the key prefixes whose cached results the write
//! made outdated.

use crate::keys::EntityId;

/// A completed write against the study data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEvent {
    // Algorithms and templates
    /// An algorithm was created or its parameters changed.
    AlgorithmUpserted { algorithm_id: EntityId },
    /// A card template was created or edited.
    TemplateUpserted { template_id: EntityId },

    // Decks
    /// A deck was created or edited. A deck always belongs to one algorithm
    /// and one template; moving it means both old and new owners change, so
    /// callers emit one event per owner pair.
    DeckUpserted {
        deck_id: EntityId,
        algorithm_id: EntityId,
        template_id: EntityId,
    },
    /// A deck and all of its cards were deleted.
    DeckDeleted {
        deck_id: EntityId,
        algorithm_id: EntityId,
        template_id: EntityId,
    },

    // Cards
    /// One or more cards were created in a deck.
    CardsCreated { deck_id: EntityId },
    /// A card's content changed.
    CardUpdated { card_id: EntityId, deck_id: EntityId },
    /// A card was deleted.
    CardDeleted { card_id: EntityId, deck_id: EntityId },

    // Study
    /// A review was recorded, rescheduling the card.
    ReviewRecorded { card_id: EntityId, deck_id: EntityId },

    // Settings
    /// A named setting was written.
    SettingChanged { name: String },
}
