//! Card editor draft state.
//!
//! The draft can be driven two ways: by [`CardDraftAction`] through the
//! typed [`Reducer`], or by action name through [`card_draft_table`], which
//! is what callers holding untyped action names use.

use crate::application::render::MarkdownRenderer;
use crate::application::repos::CardContent;
use crate::dispatch::{HandlerTable, Reducer, UnknownActionPolicy};
use crate::domain::entities::{CardRecord, DeckId, NewCard};

pub const SET_FRONT: &str = "set_front";
pub const SET_BACK: &str = "set_back";
pub const ADD_TAG: &str = "add_tag";
pub const REMOVE_TAG: &str = "remove_tag";
pub const SWAP_SIDES: &str = "swap_sides";
pub const RESET: &str = "reset";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardDraftAction {
    SetFront(String),
    SetBack(String),
    AddTag(String),
    RemoveTag(String),
    SwapSides,
    Reset,
}

impl CardDraft {
    pub fn from_card(card: &CardRecord) -> Self {
        Self {
            front: card.front_markdown.clone(),
            back: card.back_markdown.clone(),
            tags: card.tags.clone(),
        }
    }

    /// Both faces show something.
    pub fn is_submittable(&self, renderer: &MarkdownRenderer) -> bool {
        !renderer.is_empty(&self.front) && !renderer.is_empty(&self.back)
    }

    pub fn to_new_card(&self, deck_id: DeckId) -> NewCard {
        NewCard {
            deck_id,
            front_markdown: self.front.clone(),
            back_markdown: self.back.clone(),
            tags: self.tags.clone(),
        }
    }

    pub fn to_content(&self) -> CardContent {
        CardContent {
            front_markdown: self.front.clone(),
            back_markdown: self.back.clone(),
            tags: self.tags.clone(),
        }
    }

    fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if !tag.is_empty() && !self.tags.iter().any(|existing| existing == tag) {
            self.tags.push(tag.to_string());
        }
    }

    fn remove_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        self.tags.retain(|existing| existing != tag);
    }
}

impl Reducer for CardDraft {
    type Action = CardDraftAction;

    fn reduce(&mut self, action: CardDraftAction) {
        match action {
            CardDraftAction::SetFront(front) => self.front = front,
            CardDraftAction::SetBack(back) => self.back = back,
            CardDraftAction::AddTag(tag) => self.add_tag(&tag),
            CardDraftAction::RemoveTag(tag) => self.remove_tag(&tag),
            CardDraftAction::SwapSides => std::mem::swap(&mut self.front, &mut self.back),
            CardDraftAction::Reset => *self = CardDraft::default(),
        }
    }
}

/// Name-keyed handlers for the card draft. Payloads are the text argument;
/// a missing payload counts as empty text.
pub fn card_draft_table(policy: UnknownActionPolicy) -> HandlerTable<CardDraft, String> {
    HandlerTable::with_policy(policy)
        .on(SET_FRONT, |draft: &mut CardDraft, text: Option<String>| {
            draft.reduce(CardDraftAction::SetFront(text.unwrap_or_default()))
        })
        .on(SET_BACK, |draft: &mut CardDraft, text: Option<String>| {
            draft.reduce(CardDraftAction::SetBack(text.unwrap_or_default()))
        })
        .on(ADD_TAG, |draft: &mut CardDraft, tag: Option<String>| {
            if let Some(tag) = tag {
                draft.reduce(CardDraftAction::AddTag(tag));
            }
        })
        .on(REMOVE_TAG, |draft: &mut CardDraft, tag: Option<String>| {
            if let Some(tag) = tag {
                draft.reduce(CardDraftAction::RemoveTag(tag));
            }
        })
        .on(SWAP_SIDES, |draft: &mut CardDraft, _: Option<String>| {
            draft.reduce(CardDraftAction::SwapSides)
        })
        .on(RESET, |draft: &mut CardDraft, _: Option<String>| {
            draft.reduce(CardDraftAction::Reset)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::markdown;
    use crate::dispatch::{Action, Dispatch, DispatchError, dispatch_typed};

    #[test]
    fn typed_actions_edit_the_draft() {
        let mut draft = CardDraft::default();
        dispatch_typed(&mut draft, CardDraftAction::SetFront("猫".into()));
        dispatch_typed(&mut draft, CardDraftAction::SetBack("cat".into()));
        dispatch_typed(&mut draft, CardDraftAction::AddTag(" animals ".into()));
        dispatch_typed(&mut draft, CardDraftAction::AddTag("animals".into()));
        dispatch_typed(&mut draft, CardDraftAction::SwapSides);

        assert_eq!(draft.front, "cat");
        assert_eq!(draft.back, "猫");
        assert_eq!(draft.tags, vec!["animals".to_string()]);
    }

    #[test]
    fn named_actions_match_typed_ones() {
        let table = card_draft_table(UnknownActionPolicy::Ignore);
        let mut draft = CardDraft::default();

        for action in [
            Action::with_payload(SET_FRONT, "front".to_string()),
            Action::with_payload(SET_BACK, "back".to_string()),
            Action::with_payload(ADD_TAG, "verbs".to_string()),
            Action::new(SWAP_SIDES),
        ] {
            assert_eq!(table.dispatch(&mut draft, action), Ok(Dispatch::Applied));
        }

        assert_eq!(
            draft,
            CardDraft {
                front: "back".to_string(),
                back: "front".to_string(),
                tags: vec!["verbs".to_string()],
            }
        );
    }

    #[test]
    fn unknown_name_leaves_draft_alone() {
        let mut draft = CardDraft {
            front: "a".to_string(),
            back: "b".to_string(),
            tags: Vec::new(),
        };
        let before = draft.clone();

        let ignore = card_draft_table(UnknownActionPolicy::Ignore);
        assert_eq!(
            ignore.dispatch(&mut draft, Action::new("set_title")),
            Ok(Dispatch::Ignored)
        );
        assert_eq!(draft, before);

        let reject = card_draft_table(UnknownActionPolicy::Reject);
        assert!(matches!(
            reject.dispatch(&mut draft, Action::new("set_title")),
            Err(DispatchError::UnknownAction { .. })
        ));
        assert_eq!(draft, before);
    }

    #[test]
    fn blank_faces_are_not_submittable() {
        let mut draft = CardDraft::default();
        draft.reduce(CardDraftAction::SetFront("**犬**".into()));
        assert!(!draft.is_submittable(markdown()));

        draft.reduce(CardDraftAction::SetBack("<!-- todo -->".into()));
        assert!(!draft.is_submittable(markdown()));

        draft.reduce(CardDraftAction::SetBack("dog".into()));
        assert!(draft.is_submittable(markdown()));
    }
}
