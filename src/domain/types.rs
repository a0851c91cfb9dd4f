//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

use crate::keys::lessons::LessonKind;

/// Scheduling state of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    New,
    Learning,
    Review,
}

impl CardState {
    pub fn as_str(self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
        }
    }

    /// The lesson queue a card in this state is studied from.
    pub fn lesson_kind(self) -> LessonKind {
        match self {
            CardState::New => LessonKind::New,
            CardState::Learning => LessonKind::Learn,
            CardState::Review => LessonKind::Review,
        }
    }
}

/// Answer given when reviewing a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewGrade {
    Again,
    Hard,
    Good,
    Easy,
}

impl ReviewGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewGrade::Again => "again",
            ReviewGrade::Hard => "hard",
            ReviewGrade::Good => "good",
            ReviewGrade::Easy => "easy",
        }
    }

    /// True when the answer counts as remembered.
    pub fn is_pass(self) -> bool {
        !matches!(self, ReviewGrade::Again)
    }
}
