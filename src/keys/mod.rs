//! Query key taxonomy.
//!
//! A [`QueryKey`] is an ordered list of [`Segment`]s. Every cached query
//! result is addressed by one, and invalidation works on key prefixes: a
//! coarse key stales every finer key that starts with the same segments.
//!
//! The builders in the entity submodules are the only place keys are spelled
//! out. Nested builders always extend their parent's key through
//! [`QueryKey::child`], so prefix containment holds by construction.
//!
//! | Entity | Base | Detail | Nested |
//! |--------|------|--------|--------|
//! | algorithms | `[algorithms]` | `[algorithms, id]` | `[algorithm_decks, id]` |
//! | decks | `[decks]` | `[decks, id]` | |
//! | cards | `[cards, deck]` | `[cards, id]` | `[cards, deck, {page, pageSize}]`, `[cards_count, deck]` |
//! | templates | `[templates]` | `[templates, id]` | `[template_decks, id]` |
//! | lessons | `[lessons, {filters}]` | `[lesson_data, {params}]` | `[today_review_totals]` |
//! | reviews | | `[reviews, card]` | |
//! | settings | `[settings]` | `[settings, name]` | |

pub mod algorithms;
pub mod cards;
pub mod catalog;
pub mod decks;
pub mod lessons;
pub mod reviews;
pub mod settings;
pub mod templates;

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Root tags of the taxonomy.
///
/// Each variant names one key namespace. Namespaces never overlap, which is
/// why `CardsCount` is not touched by an invalidation of `Cards`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Algorithms,
    AlgorithmDecks,
    Decks,
    Cards,
    CardsCount,
    Templates,
    TemplateDecks,
    Lessons,
    LessonData,
    TodayReviewTotals,
    Reviews,
    Settings,
}

impl Tag {
    pub const ALL: [Tag; 12] = [
        Tag::Algorithms,
        Tag::AlgorithmDecks,
        Tag::Decks,
        Tag::Cards,
        Tag::CardsCount,
        Tag::Templates,
        Tag::TemplateDecks,
        Tag::Lessons,
        Tag::LessonData,
        Tag::TodayReviewTotals,
        Tag::Reviews,
        Tag::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Algorithms => "algorithms",
            Tag::AlgorithmDecks => "algorithm_decks",
            Tag::Decks => "decks",
            Tag::Cards => "cards",
            Tag::CardsCount => "cards_count",
            Tag::Templates => "templates",
            Tag::TemplateDecks => "template_decks",
            Tag::Lessons => "lessons",
            Tag::LessonData => "lesson_data",
            Tag::TodayReviewTotals => "today_review_totals",
            Tag::Reviews => "reviews",
            Tag::Settings => "settings",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical identifier segment.
///
/// Numeric, string and UUID identifiers are all coerced to their string
/// form, so `EntityId::from(3)` and `EntityId::from("3")` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! entity_id_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EntityId {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

entity_id_from_display!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, Uuid);

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for EntityId {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl From<&EntityId> for EntityId {
    fn from(value: &EntityId) -> Self {
        value.clone()
    }
}

/// Canonical filter record: field name to string-coerced value.
///
/// Backed by a `BTreeMap`, so field order is fixed by name and two records
/// with the same fields compare, hash and serialize identically no matter
/// the insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterRecord(BTreeMap<&'static str, String>);

impl FilterRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, coercing its value to a string.
    pub fn with(mut self, field: &'static str, value: impl ToString) -> Self {
        self.0.insert(field, value.to_string());
        self
    }

    /// Insert a field only when a value is present.
    pub fn with_opt<V: ToString>(self, field: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(field, value),
            None => self,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FilterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (field, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {value}")?;
        }
        f.write_str("}")
    }
}

impl Serialize for FilterRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in &self.0 {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// One atomic piece of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Tag(Tag),
    Id(EntityId),
    Filter(FilterRecord),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Tag(tag) => tag.fmt(f),
            Segment::Id(id) => id.fmt(f),
            Segment::Filter(record) => record.fmt(f),
        }
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Segment::Tag(tag) => serializer.serialize_str(tag.as_str()),
            Segment::Id(id) => id.serialize(serializer),
            Segment::Filter(record) => record.serialize(serializer),
        }
    }
}

impl From<Tag> for Segment {
    fn from(tag: Tag) -> Self {
        Segment::Tag(tag)
    }
}

impl From<EntityId> for Segment {
    fn from(id: EntityId) -> Self {
        Segment::Id(id)
    }
}

impl From<FilterRecord> for Segment {
    fn from(record: FilterRecord) -> Self {
        Segment::Filter(record)
    }
}

/// Ordered, finite sequence of segments naming one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<Segment>);

impl QueryKey {
    /// Start a key at a root tag.
    pub fn root(tag: Tag) -> Self {
        Self(vec![Segment::Tag(tag)])
    }

    pub(crate) fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Extend this key by one segment.
    pub fn child(mut self, segment: impl Into<Segment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The root tag, if the key starts with one.
    pub fn tag(&self) -> Option<Tag> {
        match self.0.first() {
            Some(Segment::Tag(tag)) => Some(*tag),
            _ => None,
        }
    }

    /// True when `prefix`'s segments are the leading segments of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            segment.fmt(f)?;
        }
        f.write_str("]")
    }
}

impl Serialize for QueryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for segment in &self.0 {
            seq.serialize_element(segment)?;
        }
        seq.end()
    }
}

impl AsRef<[Segment]> for QueryKey {
    fn as_ref(&self) -> &[Segment] {
        &self.0
    }
}

impl From<Tag> for QueryKey {
    fn from(tag: Tag) -> Self {
        QueryKey::root(tag)
    }
}
