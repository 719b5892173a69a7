//! Match details and the event timeline of one game.
//!
//! The document side reads the `games` collection, where each game embeds
//! its `home` and `away` sides and an `events` array.

use mongodb::bson::{Document, doc};

use super::{RequestParams, shape_projection};
use crate::models::enums::Cardinality;
use crate::query::errors::QueryError;
use crate::query::logical::{DocumentOperation, FindSpec, LogicalQuery, SqlStatement};
use crate::query::normalize::{CanonicalShape, FieldSpec};

pub const MATCH: &str = "match";
pub const MATCH_EVENTS: &str = "match_events";

pub static MATCH_SHAPE: CanonicalShape = CanonicalShape {
    name: MATCH,
    fields: &[
        FieldSpec::with_synonyms("game_id", &["game_id", "_id"]),
        FieldSpec::plain("competition_id"),
        FieldSpec::plain("season"),
        FieldSpec::plain("round"),
        FieldSpec::with_synonyms("date_str", &["date_str", "date"]),
        FieldSpec::with_synonyms("home_club_id", &["home_club_id", "home.club_id"]),
        FieldSpec::with_synonyms("home_name", &["home_name", "home.name"]),
        FieldSpec::with_synonyms("home_club_goals", &["home_club_goals", "home.goals", "home_goals"]),
        FieldSpec::with_synonyms(
            "home_club_formation",
            &["home_club_formation", "home.formation"],
        ),
        FieldSpec::with_synonyms("away_club_id", &["away_club_id", "away.club_id"]),
        FieldSpec::with_synonyms("away_name", &["away_name", "away.name"]),
        FieldSpec::with_synonyms("away_club_goals", &["away_club_goals", "away.goals", "away_goals"]),
        FieldSpec::with_synonyms(
            "away_club_formation",
            &["away_club_formation", "away.formation"],
        ),
        FieldSpec::plain("stadium"),
        FieldSpec::plain("attendance"),
        FieldSpec::plain("referee"),
    ],
};

pub static MATCH_EVENTS_SHAPE: CanonicalShape = CanonicalShape {
    name: MATCH_EVENTS,
    fields: &[
        FieldSpec::plain("game_id"),
        FieldSpec::plain("minute"),
        FieldSpec::with_synonyms("event_type", &["event_type", "type"]),
        FieldSpec::plain("club_id"),
        FieldSpec::plain("side"),
        FieldSpec::plain("player_id"),
        FieldSpec::plain("player_name"),
        FieldSpec::with_synonyms("player_assist_id", &["player_assist_id", "assist_id"]),
        FieldSpec::plain("assist_name"),
        FieldSpec::with_synonyms("player_in_id", &["player_in_id", "sub_in_id"]),
        FieldSpec::plain("player_in_name"),
        FieldSpec::with_synonyms("description", &["description", "event_desc"]),
    ],
};

// Formations are stored as `4-3-3` in the documents; blank means unknown.
const SELECT_GAME: &str = "SELECT g.game_id, g.competition_id, g.season, g.round,
       DATE_FORMAT(g.date, '%Y-%m-%d') AS date_str,
       g.home_club_id, hc.name AS home_name, g.home_club_goals,
       NULLIF(TRIM(REPLACE(g.home_club_formation, '/', '-')), '') AS home_club_formation,
       g.away_club_id, ac.name AS away_name, g.away_club_goals,
       NULLIF(TRIM(REPLACE(g.away_club_formation, '/', '-')), '') AS away_club_formation,
       g.stadium, g.attendance, g.referee
FROM game g
JOIN club hc ON hc.club_id = g.home_club_id
JOIN club ac ON ac.club_id = g.away_club_id
WHERE g.game_id = ?";

const SELECT_EVENTS: &str = "SELECT ge.game_id, ge.minute, ge.type AS event_type, ge.club_id,
       CASE WHEN ge.club_id = g.home_club_id THEN 'home' ELSE 'away' END AS side,
       ge.player_id, p1.name AS player_name,
       ge.player_assist_id, p2.name AS assist_name,
       ge.player_in_id, p3.name AS player_in_name,
       ge.description
FROM game_events ge
JOIN game g ON g.game_id = ge.game_id
LEFT JOIN player p1 ON p1.player_id = ge.player_id
LEFT JOIN player p2 ON p2.player_id = ge.player_assist_id
LEFT JOIN player p3 ON p3.player_id = ge.player_in_id
WHERE ge.game_id = ?
ORDER BY ge.minute, ge.game_event_id";

pub fn match_details(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let game_id = params.required_int("game_id")?;

    let sql = SqlStatement::new(SELECT_GAME, vec![game_id.into()]);
    let document = DocumentOperation::Find(
        FindSpec::new("games", doc! { "_id": game_id })
            .projection(shape_projection(&MATCH_SHAPE))
            .limit(1),
    );

    Ok(LogicalQuery {
        name: MATCH,
        sql,
        document,
        shape: &MATCH_SHAPE,
        cardinality: Cardinality::Single,
        pagination: None,
        count: None,
    })
}

/// Events of one game in minute order. Events within the same minute keep
/// their stored order.
pub fn match_events(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let game_id = params.required_int("game_id")?;

    let sql = SqlStatement::new(SELECT_EVENTS, vec![game_id.into()]);

    let mut pipeline = vec![
        doc! { "$match": { "_id": game_id } },
        doc! { "$unwind": { "path": "$events", "includeArrayIndex": "seq" } },
        doc! { "$replaceRoot": { "newRoot": { "$mergeObjects": [
            "$events",
            { "game_id": "$_id", "seq": "$seq", "home_club_id": "$home.club_id" },
        ] } } },
        doc! { "$addFields": { "side": {
            "$cond": [{ "$eq": ["$club_id", "$home_club_id"] }, "home", "away"],
        } } },
    ];
    pipeline.extend(player_name_lookup("player_id", "player_name"));
    pipeline.extend(player_name_lookup("assist_id", "assist_name"));
    pipeline.extend(player_name_lookup("sub_in_id", "player_in_name"));
    pipeline.push(doc! { "$project": { "home_club_id": 0, "_lookup": 0 } });
    pipeline.push(doc! { "$sort": { "minute": 1, "seq": 1 } });

    Ok(LogicalQuery {
        name: MATCH_EVENTS,
        sql,
        document: DocumentOperation::Aggregate {
            collection: "games".into(),
            pipeline,
        },
        shape: &MATCH_EVENTS_SHAPE,
        cardinality: Cardinality::Many,
        pagination: None,
        count: None,
    })
}

// Events carry only player ids; names come from the players collection.
fn player_name_lookup(id_field: &str, name_field: &str) -> [Document; 2] {
    [
        doc! { "$lookup": {
            "from": "players",
            "localField": id_field,
            "foreignField": "player_id",
            "as": "_lookup",
        } },
        doc! { "$addFields": { name_field: { "$arrayElemAt": ["$_lookup.name", 0] } } },
    ]
}
