//! Appearance listing with optional search, and single appearance lookup.

use mongodb::bson::{Bson, Document, doc};

use super::{
    ASSISTS_KEYS, GOALS_KEYS, MINUTES_KEYS, RED_KEYS, RequestParams, YELLOW_KEYS, shape_projection,
};
use crate::models::enums::{Cardinality, SqlParam};
use crate::query::errors::QueryError;
use crate::query::logical::{CountQuery, DocumentOperation, FindSpec, LogicalQuery, SqlStatement};
use crate::query::normalize::{CanonicalShape, FieldSpec};

pub const APPEARANCES: &str = "appearances";
pub const APPEARANCE: &str = "appearance";

const COLLECTION: &str = "appearances";

const NAME_KEYS: &[&str] = &["player_name", "name", "playerName"];
const CLUB_KEYS: &[&str] = &["club_name", "club", "team_name", "clubName"];

const APPEARANCE_FIELDS: &[FieldSpec] = &[
    FieldSpec::with_synonyms("appearance_id", &["appearance_id", "_id"]),
    FieldSpec::with_synonyms("game_id", &["game_id", "gameId", "match_id"]),
    FieldSpec::with_synonyms("player_id", &["player_id", "playerId"]),
    FieldSpec::with_synonyms("player_club_id", &["player_club_id", "club_id", "clubId"]),
    FieldSpec::plain("player_current_club_id"),
    FieldSpec::with_synonyms("date", &["date", "date_str", "match_date", "game_date"]),
    FieldSpec::with_synonyms("yellow_cards", YELLOW_KEYS),
    FieldSpec::with_synonyms("red_cards", RED_KEYS),
    FieldSpec::with_synonyms("goals", GOALS_KEYS),
    FieldSpec::with_synonyms("assists", ASSISTS_KEYS),
    FieldSpec::with_synonyms("minutes_played", MINUTES_KEYS),
    FieldSpec::with_synonyms("player_name", NAME_KEYS),
    FieldSpec::with_synonyms("club_name", CLUB_KEYS),
];

pub static APPEARANCES_SHAPE: CanonicalShape = CanonicalShape {
    name: APPEARANCES,
    fields: APPEARANCE_FIELDS,
};

pub static APPEARANCE_SHAPE: CanonicalShape = CanonicalShape {
    name: APPEARANCE,
    fields: APPEARANCE_FIELDS,
};

const SELECT_APPEARANCE: &str = "SELECT a.appearance_id, a.game_id, a.player_id, a.player_club_id,
       a.player_current_club_id, DATE_FORMAT(a.date, '%Y-%m-%d') AS date,
       a.yellow_cards, a.red_cards, a.goals, a.assists, a.minutes_played,
       p.name AS player_name, c.name AS club_name
FROM appearance a
LEFT JOIN player p ON p.player_id = a.player_id
LEFT JOIN club c ON c.club_id = a.player_club_id";

const COUNT_APPEARANCES: &str = "SELECT COUNT(*) AS total
FROM appearance a
LEFT JOIN player p ON p.player_id = a.player_id
LEFT JOIN club c ON c.club_id = a.player_club_id";

pub fn appearances(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let page = params.pagination()?;
    let search = params.text("search");

    let mut filter_params: Vec<SqlParam> = Vec::new();
    let mut where_sql = String::from("WHERE 1=1");
    if let Some(term) = search {
        let (clause, clause_params) = search_clause(term);
        where_sql.push_str(" AND ");
        where_sql.push_str(&clause);
        filter_params.extend(clause_params);
    }

    let mut list_params = filter_params.clone();
    list_params.push(page.limit().into());
    list_params.push(page.offset().into());
    let sql = SqlStatement::new(
        format!(
            "{SELECT_APPEARANCE}
{where_sql}
ORDER BY a.date DESC, a.appearance_id
LIMIT ? OFFSET ?"
        ),
        list_params,
    );
    let count_sql = SqlStatement::new(format!("{COUNT_APPEARANCES}\n{where_sql}"), filter_params);

    let filter = search.map(search_filter).unwrap_or_default();
    let document = DocumentOperation::Find(
        FindSpec::new(COLLECTION, filter.clone())
            .projection(shape_projection(&APPEARANCES_SHAPE))
            .sort(doc! { "date": -1, "appearance_id": 1 })
            .skip(page.offset().unsigned_abs())
            .limit(page.limit()),
    );

    Ok(LogicalQuery {
        name: APPEARANCES,
        sql,
        document,
        shape: &APPEARANCES_SHAPE,
        cardinality: Cardinality::Paged,
        pagination: Some(page),
        count: Some(CountQuery {
            sql: count_sql,
            document: DocumentOperation::Count {
                collection: COLLECTION.into(),
                filter,
            },
        }),
    })
}

pub fn appearance(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let appearance_id = params.required_text("appearance_id")?;

    let sql = SqlStatement::new(
        format!("{SELECT_APPEARANCE}\nWHERE a.appearance_id = ?"),
        vec![appearance_id.into()],
    );
    let document = DocumentOperation::Find(
        FindSpec::new(
            COLLECTION,
            doc! { "$or": [
                { "appearance_id": appearance_id },
                { "_id": appearance_id },
            ] },
        )
        .projection(shape_projection(&APPEARANCE_SHAPE))
        .limit(1),
    );

    Ok(LogicalQuery {
        name: APPEARANCE,
        sql,
        document,
        shape: &APPEARANCE_SHAPE,
        cardinality: Cardinality::Single,
        pagination: None,
        count: None,
    })
}

/// Player or club name contains the term, or the game id equals it when
/// it is numeric. `!` escapes LIKE wildcards in the term.
fn search_clause(term: &str) -> (String, Vec<SqlParam>) {
    let pattern = like_pattern(term);
    let mut clauses = vec!["p.name LIKE ? ESCAPE '!'", "c.name LIKE ? ESCAPE '!'"];
    let mut params = vec![SqlParam::Text(pattern.clone()), SqlParam::Text(pattern)];
    if let Ok(game_id) = term.parse::<i64>() {
        clauses.insert(0, "a.game_id = ?");
        params.insert(0, game_id.into());
    }
    (format!("({})", clauses.join(" OR ")), params)
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Document counterpart of `search_clause`: `$or` over every name and club
/// key, plus exact game id keys when the term is numeric. The term is
/// matched literally, case-insensitive.
fn search_filter(term: &str) -> Document {
    let pattern = regex::escape(term);
    let mut clauses: Vec<Bson> = Vec::new();
    if let Ok(game_id) = term.parse::<i64>() {
        clauses.push(doc! { "game_id": game_id }.into());
        clauses.push(doc! { "gameId": game_id }.into());
    }
    for key in NAME_KEYS.iter().chain(CLUB_KEYS) {
        let mut clause = Document::new();
        clause.insert(*key, doc! { "$regex": pattern.as_str(), "$options": "i" });
        clauses.push(clause.into());
    }
    doc! { "$or": clauses }
}
