//! Key builders addressable by name, for the command line.
//!
//! Builder names are `<entity>.<builder>`, e.g. `cards.paginated`. Arguments
//! are positional, except for `lessons.list`, which takes `field=value`
//! filter pairs.

use std::str::FromStr;

use thiserror::Error;

use super::cards::CardPageParams;
use super::lessons::{LessonFilters, LessonKind, LessonParams};
use super::{QueryKey, algorithms, cards, decks, lessons, reviews, settings, templates};

/// One named builder and its argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderInfo {
    pub name: &'static str,
    pub usage: &'static str,
    /// Arguments used when printing the whole taxonomy.
    pub sample: &'static [&'static str],
}

pub const BUILDERS: &[BuilderInfo] = &[
    builder("algorithms.all", "", &[]),
    builder("algorithms.detail", "<id>", &["1"]),
    builder("algorithms.decks", "<id>", &["1"]),
    builder("decks.all", "", &[]),
    builder("decks.detail", "<id>", &["42"]),
    builder("cards.deck", "<deck-id>", &["42"]),
    builder("cards.detail", "<id>", &["7"]),
    builder(
        "cards.paginated",
        "<deck-id> [page] [page-size]",
        &["42", "1", "20"],
    ),
    builder("cards.count", "<deck-id>", &["42"]),
    builder("templates.all", "", &[]),
    builder("templates.detail", "<id>", &["2"]),
    builder("templates.decks", "<id>", &["2"]),
    builder("lessons.all", "", &[]),
    builder(
        "lessons.list",
        "[algorithmId=<id>] [deckId=<id>] [templateId=<id>] [dueOnly=<bool>]",
        &["deckId=42", "dueOnly=true"],
    ),
    builder("lessons.data", "<deck-id> <new|learn|review>", &["42", "review"]),
    builder("lessons.today_review_totals", "", &[]),
    builder("reviews.card", "<card-id>", &["7"]),
    builder("settings.all", "", &[]),
    builder("settings.detail", "<name>", &["reduce_motion"]),
];

const fn builder(
    name: &'static str,
    usage: &'static str,
    sample: &'static [&'static str],
) -> BuilderInfo {
    BuilderInfo {
        name,
        usage,
        sample,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown key builder `{0}`")]
    UnknownBuilder(String),
    #[error("`{builder}` expects {usage}")]
    Arguments {
        builder: &'static str,
        usage: &'static str,
    },
    #[error("`{builder}`: invalid {argument} `{value}`")]
    InvalidArgument {
        builder: &'static str,
        argument: &'static str,
        value: String,
    },
}

pub fn lookup(name: &str) -> Option<&'static BuilderInfo> {
    BUILDERS.iter().find(|info| info.name == name)
}

/// Build the key of builder `name` from its command-line arguments.
pub fn build<S: AsRef<str>>(name: &str, args: &[S]) -> Result<QueryKey, CatalogError> {
    let info = lookup(name).ok_or_else(|| CatalogError::UnknownBuilder(name.to_string()))?;
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    let wrong_arity = || CatalogError::Arguments {
        builder: info.name,
        usage: info.usage,
    };

    let key = match (info.name, args.as_slice()) {
        ("algorithms.all", []) => algorithms::all(),
        ("algorithms.detail", [id]) => algorithms::detail(*id),
        ("algorithms.decks", [id]) => algorithms::decks(*id),
        ("decks.all", []) => decks::all(),
        ("decks.detail", [id]) => decks::detail(*id),
        ("cards.deck", [deck_id]) => cards::deck(*deck_id),
        ("cards.detail", [id]) => cards::detail(*id),
        ("cards.paginated", [deck_id, rest @ ..]) if rest.len() <= 2 => {
            let mut params = CardPageParams::new(*deck_id);
            if let Some(page) = rest.first() {
                params = params.page(parse(info, "page", page)?);
            }
            if let Some(page_size) = rest.get(1) {
                params = params.page_size(parse(info, "page size", page_size)?);
            }
            cards::paginated(&params)
        }
        ("cards.count", [deck_id]) => cards::count(*deck_id),
        ("templates.all", []) => templates::all(),
        ("templates.detail", [id]) => templates::detail(*id),
        ("templates.decks", [id]) => templates::decks(*id),
        ("lessons.all", []) => lessons::all(),
        ("lessons.list", pairs) => lessons::list(&lesson_filters(info, pairs)?),
        ("lessons.data", [deck_id, kind]) => {
            let kind = kind.parse::<LessonKind>().map_err(|err| {
                CatalogError::InvalidArgument {
                    builder: info.name,
                    argument: "lesson kind",
                    value: err.0,
                }
            })?;
            lessons::data(&LessonParams::new(*deck_id, kind))
        }
        ("lessons.today_review_totals", []) => lessons::today_review_totals(),
        ("reviews.card", [card_id]) => reviews::card(*card_id),
        ("settings.all", []) => settings::all(),
        ("settings.detail", [name]) => settings::detail(*name),
        _ => return Err(wrong_arity()),
    };
    Ok(key)
}

/// Every builder applied to its sample arguments.
pub fn samples() -> Vec<(&'static BuilderInfo, QueryKey)> {
    BUILDERS
        .iter()
        .filter_map(|info| build(info.name, info.sample).ok().map(|key| (info, key)))
        .collect()
}

fn parse<T: FromStr>(
    info: &BuilderInfo,
    argument: &'static str,
    value: &str,
) -> Result<T, CatalogError> {
    value.parse().map_err(|_| CatalogError::InvalidArgument {
        builder: info.name,
        argument,
        value: value.to_string(),
    })
}

fn lesson_filters(info: &BuilderInfo, pairs: &[&str]) -> Result<LessonFilters, CatalogError> {
    let mut filters = LessonFilters::new();
    for pair in pairs {
        let invalid = || CatalogError::InvalidArgument {
            builder: info.name,
            argument: "filter",
            value: pair.to_string(),
        };
        let (field, value) = pair.split_once('=').ok_or_else(invalid)?;
        filters = match field {
            "algorithmId" => filters.algorithm(value),
            "deckId" => filters.deck(value),
            "templateId" => filters.template(value),
            "dueOnly" => filters.due_only(parse(info, "dueOnly", value)?),
            _ => return Err(invalid()),
        };
    }
    Ok(filters)
}
