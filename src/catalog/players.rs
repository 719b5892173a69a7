//! Per-player queries: recent form, match log, season totals, profile.

use mongodb::bson::doc;

use super::{
    ASSISTS_KEYS, GOALS_KEYS, MINUTES_KEYS, RED_KEYS, RequestParams, YELLOW_KEYS, shape_projection,
};
use crate::models::enums::Cardinality;
use crate::query::errors::QueryError;
use crate::query::logical::{DocumentOperation, FindSpec, LogicalQuery, SqlStatement};
use crate::query::normalize::{CanonicalShape, FieldSpec};

pub const PLAYER_FORM: &str = "player_form";
pub const PLAYER_MATCHES: &str = "player_matches";
pub const PLAYER_SEASON_SUMMARY: &str = "player_season_summary";
pub const PLAYER_PROFILE: &str = "player_profile";

const DEFAULT_FORM_GAMES: i64 = 5;
const DEFAULT_MATCH_LOG: i64 = 10;

pub static PLAYER_FORM_SHAPE: CanonicalShape = CanonicalShape {
    name: PLAYER_FORM,
    fields: &[
        FieldSpec::with_synonyms("game_id", &["game_id", "gameId", "game._id"]),
        FieldSpec::with_synonyms("date_str", &["date_str", "game.date", "date"]),
        FieldSpec::with_synonyms("minutes_played", MINUTES_KEYS),
        FieldSpec::with_synonyms("goals", GOALS_KEYS),
        FieldSpec::with_synonyms("assists", ASSISTS_KEYS),
        FieldSpec::with_synonyms("player_club_id", &["player_club_id", "club_id", "clubId"]),
        FieldSpec::with_synonyms("home_club_id", &["home_club_id", "game.home.club_id", "home.club_id"]),
        FieldSpec::with_synonyms("home_name", &["home_name", "game.home.name", "home.name"]),
        FieldSpec::with_synonyms("away_club_id", &["away_club_id", "game.away.club_id", "away.club_id"]),
        FieldSpec::with_synonyms("away_name", &["away_name", "game.away.name", "away.name"]),
    ],
};

pub static PLAYER_MATCHES_SHAPE: CanonicalShape = CanonicalShape {
    name: PLAYER_MATCHES,
    fields: &[
        FieldSpec::with_synonyms("date_str", &["date_str", "date"]),
        FieldSpec::plain("competition_id"),
        FieldSpec::plain("season"),
        FieldSpec::with_synonyms("minutes_played", MINUTES_KEYS),
        FieldSpec::with_synonyms("goals", GOALS_KEYS),
        FieldSpec::with_synonyms("assists", ASSISTS_KEYS),
        FieldSpec::with_synonyms("yellow_cards", YELLOW_KEYS),
        FieldSpec::with_synonyms("red_cards", RED_KEYS),
        FieldSpec::with_synonyms("home_club_id", &["home_club_id", "home.club_id"]),
        FieldSpec::with_synonyms("home_name", &["home_name", "home.name"]),
        FieldSpec::with_synonyms("away_name", &["away_name", "away.name"]),
        FieldSpec::with_synonyms("away_club_id", &["away_club_id", "away.club_id"]),
        FieldSpec::with_synonyms(
            "home_club_goals",
            &["home_club_goals", "home_goals", "home_score", "hg", "home.goals"],
        ),
        FieldSpec::with_synonyms(
            "away_club_goals",
            &["away_club_goals", "away_goals", "away_score", "ag", "away.goals"],
        ),
    ],
};

pub static PLAYER_SEASON_SUMMARY_SHAPE: CanonicalShape = CanonicalShape {
    name: PLAYER_SEASON_SUMMARY,
    fields: &[
        FieldSpec::plain("competition_id"),
        FieldSpec::plain("season"),
        FieldSpec::with_synonyms("apps", &["apps", "totals.apps"]),
        FieldSpec::with_synonyms("minutes", &["minutes", "totals.minutes"]),
        FieldSpec::with_synonyms("goals", &["goals", "totals.goals"]),
        FieldSpec::with_synonyms("assists", &["assists", "totals.assists"]),
        FieldSpec::with_synonyms("yellows", &["yellows", "yc", "totals.yc"]),
        FieldSpec::with_synonyms("reds", &["reds", "rc", "totals.rc"]),
    ],
};

pub static PLAYER_PROFILE_SHAPE: CanonicalShape = CanonicalShape {
    name: PLAYER_PROFILE,
    fields: &[
        FieldSpec::plain("player_id"),
        FieldSpec::plain("name"),
        FieldSpec::plain("position"),
        FieldSpec::plain("sub_position"),
        FieldSpec::plain("current_club_id"),
        FieldSpec::plain("current_club_name"),
        FieldSpec::plain("market_value_eur"),
        FieldSpec::plain("highest_market_value_eur"),
        FieldSpec::plain("image_url"),
        FieldSpec::plain("height_in_cm"),
        FieldSpec::plain("dob"),
        FieldSpec::plain("country_of_citizenship"),
        FieldSpec::plain("foot"),
        FieldSpec::plain("city_of_birth"),
        FieldSpec::plain("agent_name"),
        FieldSpec::plain("contract_expiration_date"),
    ],
};

/// Last `n` appearances of a player in one competition season, newest first.
pub fn player_form(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let player_id = params.required_int("player_id")?;
    let competition_id = params.required_text("competition_id")?;
    let season = params.required_int("season")?;
    let n = params.int("n")?.unwrap_or(DEFAULT_FORM_GAMES).max(1);
    let mut projection = doc! { "_id": 0 };
    projection.extend(shape_projection(&PLAYER_FORM_SHAPE));

    let sql = SqlStatement::new(
        "SELECT a.game_id, DATE_FORMAT(g.date, '%Y-%m-%d') AS date_str,
       a.minutes_played, a.goals, a.assists, a.player_club_id,
       g.home_club_id, hc.name AS home_name,
       g.away_club_id, ac.name AS away_name
FROM appearance a
JOIN game g ON g.game_id = a.game_id
JOIN club hc ON hc.club_id = g.home_club_id
JOIN club ac ON ac.club_id = g.away_club_id
WHERE a.player_id = ? AND g.competition_id = ? AND g.season = ?
ORDER BY g.date DESC
LIMIT ?",
        vec![
            player_id.into(),
            competition_id.into(),
            season.into(),
            n.into(),
        ],
    );

    let document = DocumentOperation::Aggregate {
        collection: "appearances".into(),
        pipeline: vec![
            doc! { "$match": { "player_id": player_id } },
            doc! { "$lookup": {
                "from": "games",
                "localField": "game_id",
                "foreignField": "_id",
                "as": "game",
            } },
            doc! { "$unwind": "$game" },
            doc! { "$match": { "game.competition_id": competition_id, "game.season": season } },
            doc! { "$sort": { "game.date": -1 } },
            doc! { "$limit": n },
            doc! { "$project": projection },
        ],
    };

    Ok(LogicalQuery {
        name: PLAYER_FORM,
        sql,
        document,
        shape: &PLAYER_FORM_SHAPE,
        cardinality: Cardinality::Many,
        pagination: None,
        count: None,
    })
}

/// Match log for a player in one competition season. The document side
/// reads the pre-aggregated `latest_matches` embedded in `player_seasons`.
pub fn player_matches(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let player_id = params.required_int("player_id")?;
    let competition_id = params.required_text("competition_id")?;
    let season = params.required_int("season")?;
    let n = params.int("n")?.unwrap_or(DEFAULT_MATCH_LOG).max(1);

    let sql = SqlStatement::new(
        "SELECT DATE_FORMAT(g.date, '%Y-%m-%d') AS date_str, g.competition_id, g.season,
       a.minutes_played, a.goals, a.assists, a.yellow_cards, a.red_cards,
       g.home_club_id, hc.name AS home_name, ac.name AS away_name, g.away_club_id,
       g.home_club_goals, g.away_club_goals
FROM appearance a
JOIN game g ON g.game_id = a.game_id
JOIN club hc ON hc.club_id = g.home_club_id
JOIN club ac ON ac.club_id = g.away_club_id
WHERE a.player_id = ? AND g.competition_id = ? AND g.season = ?
ORDER BY g.date DESC
LIMIT ?",
        vec![
            player_id.into(),
            competition_id.into(),
            season.into(),
            n.into(),
        ],
    );

    let document = DocumentOperation::Aggregate {
        collection: "player_seasons".into(),
        pipeline: vec![
            doc! { "$match": {
                "player_id": player_id,
                "competition_id": competition_id,
                "season": season,
            } },
            doc! { "$project": {
                "_id": 0,
                "competition_id": 1,
                "season": 1,
                "matches": { "$ifNull": ["$latest_matches", "$matches", []] },
            } },
            doc! { "$unwind": "$matches" },
            doc! { "$limit": n },
            doc! { "$replaceRoot": { "newRoot": { "$mergeObjects": [
                "$matches",
                { "competition_id": "$competition_id", "season": "$season" },
            ] } } },
        ],
    };

    Ok(LogicalQuery {
        name: PLAYER_MATCHES,
        sql,
        document,
        shape: &PLAYER_MATCHES_SHAPE,
        cardinality: Cardinality::Many,
        pagination: None,
        count: None,
    })
}

/// Per competition-season totals for a player, latest season first.
pub fn player_season_summary(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let player_id = params.required_int("player_id")?;

    let sql = SqlStatement::new(
        "SELECT g.competition_id, g.season,
       COUNT(*) AS apps,
       SUM(a.minutes_played) AS minutes,
       SUM(a.goals) AS goals,
       SUM(a.assists) AS assists,
       SUM(a.yellow_cards) AS yellows,
       SUM(a.red_cards) AS reds
FROM appearance a
JOIN game g ON g.game_id = a.game_id
WHERE a.player_id = ?
GROUP BY g.competition_id, g.season
ORDER BY g.season DESC, g.competition_id",
        vec![player_id.into()],
    );

    let document = DocumentOperation::Find(
        FindSpec::new("player_seasons", doc! { "player_id": player_id })
            .projection(doc! { "_id": 0, "competition_id": 1, "season": 1, "totals": 1 })
            .sort(doc! { "season": -1, "competition_id": 1 }),
    );

    Ok(LogicalQuery {
        name: PLAYER_SEASON_SUMMARY,
        sql,
        document,
        shape: &PLAYER_SEASON_SUMMARY_SHAPE,
        cardinality: Cardinality::Many,
        pagination: None,
        count: None,
    })
}

pub fn player_profile(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let player_id = params.required_int("player_id")?;

    let sql = SqlStatement::new(
        "SELECT p.player_id, p.name, p.position, p.sub_position,
       p.current_club_id, c.name AS current_club_name,
       p.market_value_eur, p.highest_market_value_eur,
       pb.image_url, pb.height_in_cm, pb.dob, pb.country_of_citizenship, pb.foot,
       pb.city_of_birth, pb.agent_name, pb.contract_expiration_date
FROM player p
LEFT JOIN club c ON c.club_id = p.current_club_id
JOIN player_bio pb ON pb.player_id = p.player_id
WHERE p.player_id = ?",
        vec![player_id.into()],
    );

    let mut projection = doc! { "_id": 0 };
    projection.extend(shape_projection(&PLAYER_PROFILE_SHAPE));
    let document = DocumentOperation::Find(
        FindSpec::new("players", doc! { "player_id": player_id })
            .projection(projection)
            .limit(1),
    );

    Ok(LogicalQuery {
        name: PLAYER_PROFILE,
        sql,
        document,
        shape: &PLAYER_PROFILE_SHAPE,
        cardinality: Cardinality::Single,
        pagination: None,
        count: None,
    })
}
