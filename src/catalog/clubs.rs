//! Transfer return on investment for one club and transfer season.
//!
//! For every paid transfer into the club, the player's minutes, goals and
//! assists for that club from the transfer date on, and the fee per minute
//! and per goal contribution.

use mongodb::bson::doc;

use super::RequestParams;
use crate::models::enums::Cardinality;
use crate::query::errors::QueryError;
use crate::query::logical::{DocumentOperation, LogicalQuery, SqlStatement};
use crate::query::normalize::{CanonicalShape, FieldSpec};

pub const CLUB_ROI: &str = "club_roi";

const MAX_ROWS: i64 = 200;

/// Columns `sort_by` may name. Anything else sorts by `post_minutes`.
pub const SORT_COLUMNS: &[&str] = &[
    "post_minutes",
    "post_goals",
    "post_assists",
    "eur_per_minutes",
    "eur_per_contrib",
    "transfer_fee",
    "market_value_in_eur",
];

pub static CLUB_ROI_SHAPE: CanonicalShape = CanonicalShape {
    name: CLUB_ROI,
    fields: &[
        FieldSpec::plain("player_id"),
        FieldSpec::with_synonyms("player_name", &["player_name", "name"]),
        FieldSpec::plain("transfer_season"),
        FieldSpec::plain("transfer_fee"),
        FieldSpec::with_synonyms("market_value_in_eur", &["market_value_in_eur", "market_value_eur"]),
        FieldSpec::with_synonyms("post_minutes", &["post_minutes", "post.minutes"]),
        FieldSpec::with_synonyms("post_goals", &["post_goals", "post.goals"]),
        FieldSpec::with_synonyms("post_assists", &["post_assists", "post.assists"]),
        FieldSpec::plain("eur_per_minutes"),
        FieldSpec::plain("eur_per_contrib"),
    ],
};

pub fn club_roi(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let club_id = params.required_int("club_id")?;
    let season = params.required_text("season")?;
    let sort_by = params
        .text("sort_by")
        .and_then(|s| SORT_COLUMNS.iter().copied().find(|c| *c == s))
        .unwrap_or(SORT_COLUMNS[0]);
    let descending = params
        .text("order")
        .is_none_or(|o| o.eq_ignore_ascii_case("desc"));

    let sql = SqlStatement::new(
        format!(
            "SELECT t.player_id, p.name AS player_name, t.transfer_season,
       t.transfer_fee, t.market_value_in_eur,
       COALESCE(SUM(a.minutes_played), 0) AS post_minutes,
       COALESCE(SUM(a.goals), 0) AS post_goals,
       COALESCE(SUM(a.assists), 0) AS post_assists,
       ROUND(t.transfer_fee / NULLIF(SUM(a.minutes_played), 0), 3) AS eur_per_minutes,
       ROUND(t.transfer_fee / NULLIF(SUM(a.goals) + SUM(a.assists), 0), 3) AS eur_per_contrib
FROM transfer t
LEFT JOIN player p ON p.player_id = t.player_id
LEFT JOIN appearance a
       ON a.player_id = t.player_id
      AND a.player_club_id = t.to_club_id
      AND a.date >= t.transfer_date
WHERE t.to_club_id = ? AND t.transfer_season = ? AND t.transfer_fee > 0
GROUP BY t.transfer_id, t.player_id, p.name, t.transfer_season,
         t.transfer_fee, t.market_value_in_eur
ORDER BY {sort_by} {order}, t.player_id
LIMIT ?",
            order = if descending { "DESC" } else { "ASC" },
        ),
        vec![club_id.into(), season.into(), MAX_ROWS.into()],
    );

    let stat = |long: &str, short: &str| doc! { "$ifNull": [format!("${long}"), format!("${short}"), 0] };
    let post = doc! { "$lookup": {
        "from": "appearances",
        "let": { "pid": "$player_id", "since": "$transfer_date" },
        "pipeline": [
            { "$match": { "$expr": { "$and": [
                { "$eq": ["$player_id", "$$pid"] },
                { "$eq": [{ "$ifNull": ["$player_club_id", "$club_id"] }, club_id] },
                { "$gte": ["$date", "$$since"] },
            ] } } },
            { "$group": {
                "_id": null,
                "minutes": { "$sum": stat("minutes_played", "min") },
                "goals": { "$sum": stat("goals", "g") },
                "assists": { "$sum": stat("assists", "a") },
            } },
        ],
        "as": "post",
    } };
    let per = |divisor: mongodb::bson::Bson| {
        doc! { "$cond": [
            { "$gt": [divisor.clone(), 0] },
            { "$round": [{ "$divide": ["$transfer_fee", divisor] }, 3] },
            null,
        ] }
    };

    let pipeline = vec![
        doc! { "$match": {
            "to.club_id": club_id,
            "transfer_season": season,
            "transfer_fee": { "$gt": 0 },
        } },
        post,
        doc! { "$unwind": { "path": "$post", "preserveNullAndEmptyArrays": true } },
        doc! { "$lookup": {
            "from": "players",
            "localField": "player_id",
            "foreignField": "player_id",
            "as": "player",
        } },
        doc! { "$project": {
            "_id": 0,
            "player_id": 1,
            "player_name": { "$ifNull": ["$player_name", { "$arrayElemAt": ["$player.name", 0] }] },
            "transfer_season": 1,
            "transfer_fee": 1,
            "market_value_in_eur": 1,
            "post_minutes": { "$ifNull": ["$post.minutes", 0] },
            "post_goals": { "$ifNull": ["$post.goals", 0] },
            "post_assists": { "$ifNull": ["$post.assists", 0] },
        } },
        doc! { "$addFields": {
            "eur_per_minutes": per("$post_minutes".into()),
            "eur_per_contrib": per(doc! { "$add": ["$post_goals", "$post_assists"] }.into()),
        } },
        doc! { "$sort": { sort_by: if descending { -1 } else { 1 }, "player_id": 1 } },
        doc! { "$limit": MAX_ROWS },
    ];

    Ok(LogicalQuery {
        name: CLUB_ROI,
        sql,
        document: DocumentOperation::Aggregate {
            collection: "transfers".into(),
            pipeline,
        },
        shape: &CLUB_ROI_SHAPE,
        cardinality: Cardinality::Many,
        pagination: None,
        count: None,
    })
}
