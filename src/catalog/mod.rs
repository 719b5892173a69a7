//! Catalog of logical queries.
//!
//! Each entry turns request parameters into a `LogicalQuery`: the MySQL
//! statement, the equivalent document-store operation, and the canonical
//! shape both answers are normalized into.

use std::collections::HashMap;

use mongodb::bson::Document;
use once_cell::sync::Lazy;

use crate::models::structs::Pagination;
use crate::query::errors::QueryError;
use crate::query::logical::LogicalQuery;
use crate::query::normalize::CanonicalShape;

pub mod appearances;
pub mod clubs;
pub mod matches;
pub mod players;
pub mod scorers;

type Builder = fn(&RequestParams) -> Result<LogicalQuery, QueryError>;

static CATALOG: Lazy<HashMap<&'static str, Builder>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Builder> = HashMap::new();
    m.insert(scorers::TOP_SCORERS, scorers::top_scorers);
    m.insert(players::PLAYER_FORM, players::player_form);
    m.insert(players::PLAYER_MATCHES, players::player_matches);
    m.insert(players::PLAYER_SEASON_SUMMARY, players::player_season_summary);
    m.insert(players::PLAYER_PROFILE, players::player_profile);
    m.insert(appearances::APPEARANCES, appearances::appearances);
    m.insert(appearances::APPEARANCE, appearances::appearance);
    m.insert(matches::MATCH, matches::match_details);
    m.insert(matches::MATCH_EVENTS, matches::match_events);
    m.insert(clubs::CLUB_ROI, clubs::club_roi);
    m
});

/// Bind `params` to the logical query registered as `name`.
pub fn build(name: &str, params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let builder = CATALOG
        .get(name)
        .ok_or_else(|| QueryError::UnknownQuery(name.to_string()))?;
    builder(params)
}

pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = CATALOG.keys().copied().collect();
    names.sort_unstable();
    names
}

// Raw keys known to carry the same stat across the relational projection
// and the denormalized documents.
pub(crate) const MINUTES_KEYS: &[&str] = &[
    "minutes_played",
    "minutes",
    "mins",
    "min",
    "time_played",
    "stats.minutes_played",
];
pub(crate) const GOALS_KEYS: &[&str] = &["goals", "goal", "goals_scored", "g", "stats.goals"];
pub(crate) const ASSISTS_KEYS: &[&str] = &["assists", "assist", "a", "stats.assists"];
pub(crate) const YELLOW_KEYS: &[&str] = &["yellow_cards", "yellow", "yc", "stats.yellow_cards"];
pub(crate) const RED_KEYS: &[&str] = &["red_cards", "red", "rc", "stats.red_cards"];

/// Inclusion projection over the top-level segment of every raw key the
/// shape reads, so no synonym is dropped before normalization. `_id`
/// keeps the server default.
pub(crate) fn shape_projection(shape: &CanonicalShape) -> Document {
    let mut projection = Document::new();
    for field in shape.fields {
        for &key in field.keys() {
            let top = key.split('.').next().unwrap_or(key);
            if top != "_id" {
                projection.insert(top, 1);
            }
        }
    }
    projection
}

/// Request parameters as received from the caller, typed on access.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    values: HashMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl ToString) {
        self.values.insert(name.to_string(), value.to_string());
    }

    /// Trimmed value; empty strings count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required_text(&self, name: &str) -> Result<&str, QueryError> {
        self.text(name)
            .ok_or_else(|| QueryError::invalid_param(name, "required"))
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, QueryError> {
        self.text(name)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| QueryError::invalid_param(name, format!("'{}' is not an integer", v)))
            })
            .transpose()
    }

    pub fn required_int(&self, name: &str) -> Result<i64, QueryError> {
        self.int(name)?
            .ok_or_else(|| QueryError::invalid_param(name, "required"))
    }

    /// `page` and `page_size`, clamped.
    pub fn pagination(&self) -> Result<Pagination, QueryError> {
        Pagination::clamped(self.int("page")?, self.int("page_size")?)
    }
}

impl FromIterator<(String, String)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
