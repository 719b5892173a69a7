//! Top scorers of a competition season, paginated.

use mongodb::bson::doc;

use super::RequestParams;
use crate::models::enums::{Cardinality, SqlParam};
use crate::query::errors::QueryError;
use crate::query::logical::{CountQuery, DocumentOperation, LogicalQuery, SqlStatement};
use crate::query::normalize::{CanonicalShape, FieldSpec};

pub const TOP_SCORERS: &str = "top_scorers";

pub static TOP_SCORERS_SHAPE: CanonicalShape = CanonicalShape {
    name: TOP_SCORERS,
    fields: &[
        FieldSpec::plain("player_id"),
        FieldSpec::with_synonyms("player_name", &["player_name", "name", "player.name"]),
        FieldSpec::with_synonyms("image_url", &["image_url", "player.image_url"]),
        FieldSpec::with_synonyms("goals", &["goals", "totals.goals"]),
        FieldSpec::with_synonyms(
            "club_name",
            &["club_name", "current_club_name", "player.current_club_name"],
        ),
    ],
};

// Each player is credited to the club with the most goals for them that season.
const BEST_CLUB_CTE: &str = "
WITH per AS (
    SELECT a.player_id, a.player_club_id, SUM(a.goals) AS goals
    FROM appearance a
    JOIN game g ON g.game_id = a.game_id
    WHERE g.competition_id = ? AND g.season = ?
    GROUP BY a.player_id, a.player_club_id
), best AS (
    SELECT player_id, player_club_id, goals,
           ROW_NUMBER() OVER (PARTITION BY player_id ORDER BY goals DESC) AS rn
    FROM per
)";

pub fn top_scorers(params: &RequestParams) -> Result<LogicalQuery, QueryError> {
    let competition_id = params.required_text("competition_id")?;
    let season = params.required_int("season")?;
    let page = params.pagination()?;

    let sql = SqlStatement::new(
        format!(
            "{BEST_CLUB_CTE}
SELECT b.player_id, p.name AS player_name, pb.image_url,
       b.goals, c.name AS club_name
FROM best b
JOIN player p ON p.player_id = b.player_id
JOIN player_bio pb ON pb.player_id = b.player_id
LEFT JOIN club c ON c.club_id = b.player_club_id
WHERE b.rn = 1 AND b.goals > 0
ORDER BY b.goals DESC, b.player_id
LIMIT ? OFFSET ?"
        ),
        vec![
            competition_id.into(),
            season.into(),
            page.limit().into(),
            page.offset().into(),
        ],
    );
    let count_sql = SqlStatement::new(
        format!(
            "{BEST_CLUB_CTE}
SELECT COUNT(*) AS total
FROM best b
JOIN player p ON p.player_id = b.player_id
JOIN player_bio pb ON pb.player_id = b.player_id
WHERE b.rn = 1 AND b.goals > 0"
        ),
        vec![SqlParam::from(competition_id), season.into()],
    );

    let filter = doc! {
        "competition_id": competition_id,
        "season": season,
        "totals.goals": { "$gt": 0 },
    };
    let document = DocumentOperation::Aggregate {
        collection: "player_seasons".into(),
        pipeline: vec![
            doc! { "$match": filter.clone() },
            doc! { "$sort": { "totals.goals": -1, "player_id": 1 } },
            doc! { "$skip": page.offset() },
            doc! { "$limit": page.limit() },
            doc! { "$lookup": {
                "from": "players",
                "localField": "player_id",
                "foreignField": "player_id",
                "as": "player",
            } },
            doc! { "$unwind": { "path": "$player", "preserveNullAndEmptyArrays": true } },
            doc! { "$project": {
                "_id": 0,
                "player_id": 1,
                "totals.goals": 1,
                "player.name": 1,
                "player.image_url": 1,
                "player.current_club_name": 1,
            } },
        ],
    };

    Ok(LogicalQuery {
        name: TOP_SCORERS,
        sql,
        document,
        shape: &TOP_SCORERS_SHAPE,
        cardinality: Cardinality::Paged,
        pagination: Some(page),
        count: Some(CountQuery {
            sql: count_sql,
            document: DocumentOperation::Count {
                collection: "player_seasons".into(),
                filter,
            },
        }),
    })
}
