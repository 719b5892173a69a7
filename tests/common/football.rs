//! A few weeks of one Premier League season, kept once and rendered two
//! ways: as the rows each catalog statement returns from MySQL, and as the
//! documents the read model stores (abbreviated stat keys, nested `home`
//! and `away`, embedded `latest_matches` and `events`).
//!
//! Neither fake runs the statement or the pipeline; each answer below is
//! computed from the fixture the way the engine would compute it.

use std::cmp::Ordering;
use std::sync::Arc;

use mongodb::bson::{Bson, Document, doc};
use serde_json::{Value, json};

use pitchstats::models::enums::SqlParam;
use pitchstats::models::structs::RawRow;
use pitchstats::query::{DocumentOperation, DocumentOutput};
use pitchstats::{QueryService, RequestParams};

use super::{DocResponder, FakeDocuments, FakeSql, SqlResponder, SqlScript, raw};

pub struct Club {
    pub id: i64,
    pub name: &'static str,
}

pub const CLUBS: &[Club] = &[
    Club { id: 11, name: "Arsenal" },
    Club { id: 31, name: "Liverpool" },
    Club { id: 281, name: "Manchester City" },
];

pub struct Player {
    pub id: i64,
    pub name: &'static str,
    pub position: &'static str,
    pub sub_position: &'static str,
    pub club_id: i64,
    pub market_value: i64,
    pub highest_market_value: i64,
    pub height_in_cm: i64,
    pub dob: &'static str,
    pub country: &'static str,
    pub foot: &'static str,
    pub city_of_birth: &'static str,
    pub agent_name: &'static str,
    pub contract_expiration_date: &'static str,
}

pub const SAKA: i64 = 433177;
pub const RICE: i64 = 357662;
pub const HAVERTZ: i64 = 309400;
pub const TROSSARD: i64 = 203460;
pub const RAYA: i64 = 262749;
pub const SALAH: i64 = 148455;
pub const HAALAND: i64 = 418560;

pub const PLAYERS: &[Player] = &[
    Player {
        id: SAKA,
        name: "Bukayo Saka",
        position: "Attack",
        sub_position: "Right Winger",
        club_id: 11,
        market_value: 120_000_000,
        highest_market_value: 120_000_000,
        height_in_cm: 178,
        dob: "2001-09-05",
        country: "England",
        foot: "left",
        city_of_birth: "London",
        agent_name: "Roc Nation Sports",
        contract_expiration_date: "2027-06-30",
    },
    Player {
        id: RICE,
        name: "Declan Rice",
        position: "Midfield",
        sub_position: "Defensive Midfield",
        club_id: 11,
        market_value: 110_000_000,
        highest_market_value: 110_000_000,
        height_in_cm: 185,
        dob: "1999-01-14",
        country: "England",
        foot: "right",
        city_of_birth: "London",
        agent_name: "Sports Management International",
        contract_expiration_date: "2028-06-30",
    },
    Player {
        id: HAVERTZ,
        name: "Kai Havertz",
        position: "Attack",
        sub_position: "Centre-Forward",
        club_id: 11,
        market_value: 70_000_000,
        highest_market_value: 90_000_000,
        height_in_cm: 193,
        dob: "1999-06-11",
        country: "Germany",
        foot: "left",
        city_of_birth: "Aachen",
        agent_name: "Sports360",
        contract_expiration_date: "2028-06-30",
    },
    Player {
        id: TROSSARD,
        name: "Leandro Trossard",
        position: "Attack",
        sub_position: "Left Winger",
        club_id: 11,
        market_value: 25_000_000,
        highest_market_value: 35_000_000,
        height_in_cm: 172,
        dob: "1994-12-04",
        country: "Belgium",
        foot: "both",
        city_of_birth: "Maasmechelen",
        agent_name: "Kelly Sports",
        contract_expiration_date: "2027-06-30",
    },
    Player {
        id: RAYA,
        name: "David Raya",
        position: "Goalkeeper",
        sub_position: "Goalkeeper",
        club_id: 11,
        market_value: 35_000_000,
        highest_market_value: 40_000_000,
        height_in_cm: 183,
        dob: "1995-09-15",
        country: "Spain",
        foot: "right",
        city_of_birth: "Barcelona",
        agent_name: "Unique Sports Group",
        contract_expiration_date: "2028-06-30",
    },
    Player {
        id: SALAH,
        name: "Mohamed Salah",
        position: "Attack",
        sub_position: "Right Winger",
        club_id: 31,
        market_value: 55_000_000,
        highest_market_value: 150_000_000,
        height_in_cm: 175,
        dob: "1992-06-15",
        country: "Egypt",
        foot: "left",
        city_of_birth: "Nagrig, Basyoun",
        agent_name: "Ramy Abbas Issa",
        contract_expiration_date: "2025-06-30",
    },
    Player {
        id: HAALAND,
        name: "Erling Haaland",
        position: "Attack",
        sub_position: "Centre-Forward",
        club_id: 281,
        market_value: 180_000_000,
        highest_market_value: 180_000_000,
        height_in_cm: 195,
        dob: "2000-07-21",
        country: "Norway",
        foot: "left",
        city_of_birth: "Leeds",
        agent_name: "Rafaela Pimenta",
        contract_expiration_date: "2034-06-30",
    },
];

pub struct Game {
    pub id: i64,
    pub competition_id: &'static str,
    pub season: i64,
    pub round: &'static str,
    pub date: &'static str,
    pub home: i64,
    pub away: i64,
    pub home_goals: i64,
    pub away_goals: i64,
    /// Blank when the source did not record it.
    pub home_formation: &'static str,
    pub away_formation: &'static str,
    pub stadium: &'static str,
    pub attendance: i64,
    pub referee: &'static str,
}

pub const GAMES: &[Game] = &[
    Game {
        id: 3901,
        competition_id: "GB1",
        season: 2022,
        round: "30. Matchday",
        date: "2023-04-09",
        home: 31,
        away: 281,
        home_goals: 1,
        away_goals: 3,
        home_formation: "4-3-3",
        away_formation: "3-2-4-1",
        stadium: "Anfield",
        attendance: 53163,
        referee: "Paul Tierney",
    },
    Game {
        id: 4101,
        competition_id: "GB1",
        season: 2023,
        round: "1. Matchday",
        date: "2023-08-12",
        home: 11,
        away: 281,
        home_goals: 2,
        away_goals: 1,
        home_formation: "4-3-3",
        away_formation: "4-1-4-1",
        stadium: "Emirates Stadium",
        attendance: 60192,
        referee: "Michael Oliver",
    },
    Game {
        id: 4102,
        competition_id: "GB1",
        season: 2023,
        round: "2. Matchday",
        date: "2023-08-19",
        home: 31,
        away: 11,
        home_goals: 1,
        away_goals: 1,
        home_formation: "4-3-3",
        away_formation: "4-3-3",
        stadium: "Anfield",
        attendance: 53145,
        referee: "Anthony Taylor",
    },
    Game {
        id: 4103,
        competition_id: "GB1",
        season: 2023,
        round: "3. Matchday",
        date: "2023-08-26",
        home: 281,
        away: 31,
        home_goals: 3,
        away_goals: 1,
        home_formation: "4-1-4-1",
        away_formation: "4-3-3",
        stadium: "Etihad Stadium",
        attendance: 53400,
        referee: "Simon Hooper",
    },
    Game {
        id: 4104,
        competition_id: "GB1",
        season: 2023,
        round: "4. Matchday",
        date: "2023-09-02",
        home: 11,
        away: 31,
        home_goals: 2,
        away_goals: 2,
        home_formation: "4-3-3",
        away_formation: "",
        stadium: "Emirates Stadium",
        attendance: 60245,
        referee: "Chris Kavanagh",
    },
    Game {
        id: 4105,
        competition_id: "GB1",
        season: 2023,
        round: "5. Matchday",
        date: "2023-09-16",
        home: 281,
        away: 11,
        home_goals: 0,
        away_goals: 1,
        home_formation: "3-2-4-1",
        away_formation: "4-3-3",
        stadium: "Etihad Stadium",
        attendance: 53398,
        referee: "Michael Oliver",
    },
];

pub struct Appearance {
    pub game_id: i64,
    pub player_id: i64,
    pub club_id: i64,
    pub minutes: i64,
    pub goals: i64,
    pub assists: i64,
    pub yellow: i64,
    pub red: i64,
}

const fn app(
    game_id: i64,
    player_id: i64,
    club_id: i64,
    minutes: i64,
    goals: i64,
    assists: i64,
    yellow: i64,
    red: i64,
) -> Appearance {
    Appearance {
        game_id,
        player_id,
        club_id,
        minutes,
        goals,
        assists,
        yellow,
        red,
    }
}

pub const APPEARANCES: &[Appearance] = &[
    app(3901, SALAH, 31, 90, 1, 0, 0, 0),
    app(3901, HAALAND, 281, 90, 3, 1, 0, 0),
    app(4101, SAKA, 11, 90, 1, 1, 0, 0),
    app(4101, RICE, 11, 90, 1, 0, 1, 0),
    app(4101, HAVERTZ, 11, 72, 0, 0, 0, 0),
    app(4101, HAALAND, 281, 90, 1, 0, 1, 0),
    app(4102, SALAH, 31, 90, 1, 0, 0, 0),
    app(4102, SAKA, 11, 85, 1, 0, 1, 0),
    app(4102, RICE, 11, 90, 0, 1, 0, 0),
    app(4102, HAVERTZ, 11, 60, 0, 0, 0, 0),
    app(4102, RAYA, 11, 90, 0, 0, 0, 0),
    app(4103, HAALAND, 281, 80, 3, 0, 0, 0),
    app(4103, SALAH, 31, 90, 1, 0, 0, 0),
    app(4104, SAKA, 11, 90, 0, 2, 0, 0),
    app(4104, RICE, 11, 90, 1, 0, 0, 0),
    app(4104, HAVERTZ, 11, 88, 1, 0, 0, 0),
    app(4104, RAYA, 11, 90, 0, 0, 0, 0),
    app(4104, TROSSARD, 11, 2, 0, 0, 0, 0),
    app(4104, SALAH, 31, 90, 2, 0, 1, 0),
    app(4105, SAKA, 11, 90, 1, 0, 0, 0),
    app(4105, RICE, 11, 90, 0, 1, 0, 0),
    app(4105, RAYA, 11, 90, 0, 0, 0, 0),
    app(4105, HAALAND, 281, 90, 0, 0, 0, 1),
];

pub struct Event {
    pub id: i64,
    pub game_id: i64,
    pub minute: i64,
    pub kind: &'static str,
    pub club_id: i64,
    pub player_id: i64,
    pub assist_id: Option<i64>,
    pub player_in_id: Option<i64>,
    pub description: &'static str,
}

/// Stored in `game_event_id` order.
pub const EVENTS: &[Event] = &[
    Event { id: 9001, game_id: 4104, minute: 12, kind: "Goals", club_id: 31, player_id: SALAH, assist_id: None, player_in_id: None, description: "Right-footed shot" },
    Event { id: 9002, game_id: 4104, minute: 34, kind: "Goals", club_id: 11, player_id: RICE, assist_id: Some(SAKA), player_in_id: None, description: "Header" },
    Event { id: 9003, game_id: 4104, minute: 58, kind: "Cards", club_id: 31, player_id: SALAH, assist_id: None, player_in_id: None, description: "1. Yellow card, Foul" },
    Event { id: 9004, game_id: 4104, minute: 58, kind: "Goals", club_id: 11, player_id: HAVERTZ, assist_id: Some(SAKA), player_in_id: None, description: "Left-footed shot" },
    Event { id: 9005, game_id: 4104, minute: 88, kind: "Substitutions", club_id: 11, player_id: HAVERTZ, assist_id: None, player_in_id: Some(TROSSARD), description: "" },
    Event { id: 9006, game_id: 4104, minute: 90, kind: "Goals", club_id: 31, player_id: SALAH, assist_id: None, player_in_id: None, description: "Penalty" },
];

pub struct Transfer {
    pub id: i64,
    pub player_id: i64,
    pub date: &'static str,
    pub season: &'static str,
    pub from_club_id: i64,
    pub to_club_id: i64,
    pub fee: i64,
    pub market_value: i64,
}

pub const TRANSFERS: &[Transfer] = &[
    Transfer { id: 501, player_id: RICE, date: "2023-07-15", season: "23/24", from_club_id: 379, to_club_id: 11, fee: 116_600_000, market_value: 90_000_000 },
    Transfer { id: 502, player_id: HAVERTZ, date: "2023-06-28", season: "23/24", from_club_id: 631, to_club_id: 11, fee: 75_000_000, market_value: 70_000_000 },
    Transfer { id: 503, player_id: TROSSARD, date: "2023-01-20", season: "22/23", from_club_id: 1237, to_club_id: 11, fee: 24_000_000, market_value: 25_000_000 },
    Transfer { id: 504, player_id: RAYA, date: "2023-08-14", season: "23/24", from_club_id: 1148, to_club_id: 11, fee: 3_000_000, market_value: 35_000_000 },
    Transfer { id: 505, player_id: 85352, date: "2023-07-01", season: "23/24", from_club_id: 1148, to_club_id: 11, fee: 0, market_value: 5_000_000 },
];

fn club_name(id: i64) -> Option<&'static str> {
    CLUBS.iter().find(|c| c.id == id).map(|c| c.name)
}

fn player(id: i64) -> Option<&'static Player> {
    PLAYERS.iter().find(|p| p.id == id)
}

fn player_name(id: Option<i64>) -> Option<&'static str> {
    id.and_then(player).map(|p| p.name)
}

fn game(id: i64) -> &'static Game {
    GAMES.iter().find(|g| g.id == id).expect("fixture game")
}

pub fn image_url(player_id: i64) -> String {
    format!("https://img.example/portrait/{}.jpg", player_id)
}

fn appearance_id(a: &Appearance) -> String {
    format!("{}_{}", a.game_id, a.player_id)
}

fn newest_first(a: &&Appearance, b: &&Appearance) -> Ordering {
    game(b.game_id).date.cmp(game(a.game_id).date)
}

/// Appearances of one player in one competition season, newest first.
fn season_appearances(player_id: i64, competition_id: &str, season: i64) -> Vec<&'static Appearance> {
    let mut apps: Vec<_> = APPEARANCES
        .iter()
        .filter(|a| {
            let g = game(a.game_id);
            a.player_id == player_id && g.competition_id == competition_id && g.season == season
        })
        .collect();
    apps.sort_by(newest_first);
    apps
}

fn int(params: &RequestParams, name: &str) -> i64 {
    params.required_int(name).expect(name)
}

fn text<'a>(params: &'a RequestParams, name: &str) -> &'a str {
    params.required_text(name).expect(name)
}

fn limit(params: &RequestParams, default: i64) -> usize {
    params.int("n").expect("n").unwrap_or(default).max(1) as usize
}

fn window<T>(items: Vec<T>, params: &RequestParams) -> Vec<T> {
    let page = params.pagination().expect("page");
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

// ---- answers shared by both renderings ----

/// (player_id, club_id, goals) in ranking order.
fn scorers(competition_id: &str, season: i64) -> Vec<(i64, i64, i64)> {
    let mut per: Vec<(i64, i64, i64)> = Vec::new();
    for a in APPEARANCES {
        let g = game(a.game_id);
        if g.competition_id != competition_id || g.season != season {
            continue;
        }
        match per.iter_mut().find(|(p, c, _)| *p == a.player_id && *c == a.club_id) {
            Some(entry) => entry.2 += a.goals,
            None => per.push((a.player_id, a.club_id, a.goals)),
        }
    }
    let mut best: Vec<(i64, i64, i64)> = Vec::new();
    for entry in per {
        match best.iter_mut().find(|b| b.0 == entry.0) {
            Some(b) if entry.2 > b.2 => *b = entry,
            Some(_) => {}
            None => best.push(entry),
        }
    }
    best.retain(|b| b.2 > 0);
    best.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
    best
}

fn searched_appearances(params: &RequestParams) -> Vec<&'static Appearance> {
    let term = params.text("search");
    let mut apps: Vec<&Appearance> = APPEARANCES
        .iter()
        .filter(|a| {
            let Some(term) = term else {
                return true;
            };
            let needle = term.to_lowercase();
            let named = [player_name(Some(a.player_id)), club_name(a.club_id)]
                .into_iter()
                .flatten()
                .any(|n| n.to_lowercase().contains(&needle));
            named || term.parse::<i64>().is_ok_and(|id| id == a.game_id)
        })
        .collect();
    apps.sort_by(|a, b| newest_first(a, b).then_with(|| appearance_id(a).cmp(&appearance_id(b))));
    apps
}

struct Roi {
    transfer: &'static Transfer,
    minutes: i64,
    goals: i64,
    assists: i64,
}

impl Roi {
    fn per(&self, divisor: i64) -> Option<f64> {
        (divisor > 0).then(|| (self.transfer.fee as f64 / divisor as f64 * 1000.0).round() / 1000.0)
    }

    fn per_minute(&self) -> Option<f64> {
        self.per(self.minutes)
    }

    fn per_contribution(&self) -> Option<f64> {
        self.per(self.goals + self.assists)
    }

    fn sort_key(&self, column: &str) -> Option<f64> {
        match column {
            "post_goals" => Some(self.goals as f64),
            "post_assists" => Some(self.assists as f64),
            "eur_per_minutes" => self.per_minute(),
            "eur_per_contrib" => self.per_contribution(),
            "transfer_fee" => Some(self.transfer.fee as f64),
            "market_value_in_eur" => Some(self.transfer.market_value as f64),
            _ => Some(self.minutes as f64),
        }
    }
}

fn club_roi(params: &RequestParams) -> Vec<Roi> {
    let club_id = int(params, "club_id");
    let season = text(params, "season");
    let column = params.text("sort_by").unwrap_or("post_minutes");
    let descending = params.text("order").is_none_or(|o| o.eq_ignore_ascii_case("desc"));

    let mut rows: Vec<Roi> = TRANSFERS
        .iter()
        .filter(|t| t.to_club_id == club_id && t.season == season && t.fee > 0)
        .map(|t| {
            let post: Vec<&Appearance> = APPEARANCES
                .iter()
                .filter(|a| a.player_id == t.player_id && a.club_id == club_id)
                .filter(|a| game(a.game_id).date >= t.date)
                .collect();
            Roi {
                transfer: t,
                minutes: post.iter().map(|a| a.minutes).sum(),
                goals: post.iter().map(|a| a.goals).sum(),
                assists: post.iter().map(|a| a.assists).sum(),
            }
        })
        .collect();
    // nulls sort lowest on both engines
    rows.sort_by(|a, b| {
        let ka = a.sort_key(column).unwrap_or(f64::NEG_INFINITY);
        let kb = b.sort_key(column).unwrap_or(f64::NEG_INFINITY);
        let primary = if descending { kb.total_cmp(&ka) } else { ka.total_cmp(&kb) };
        primary.then(a.transfer.player_id.cmp(&b.transfer.player_id))
    });
    rows
}

fn events(game_id: i64) -> Vec<(usize, &'static Event)> {
    let mut evs: Vec<(usize, &Event)> = EVENTS
        .iter()
        .filter(|e| e.game_id == game_id)
        .enumerate()
        .collect();
    evs.sort_by(|a, b| a.1.minute.cmp(&b.1.minute).then(a.0.cmp(&b.0)));
    evs
}

// ---- relational rendering ----

/// MySQL hands back integral DECIMAL results as integers.
fn decimal(v: Option<f64>) -> Value {
    match v {
        Some(f) if f.fract() == 0.0 => json!(f as i64),
        Some(f) => json!(f),
        None => Value::Null,
    }
}

fn formation(f: &str) -> Value {
    if f.trim().is_empty() { Value::Null } else { json!(f.replace('/', "-")) }
}

fn appearance_row(a: &Appearance) -> RawRow {
    raw(json!({
        "appearance_id": appearance_id(a),
        "game_id": a.game_id,
        "player_id": a.player_id,
        "player_club_id": a.club_id,
        "player_current_club_id": player(a.player_id).map(|p| p.club_id),
        "date": game(a.game_id).date,
        "yellow_cards": a.yellow,
        "red_cards": a.red,
        "goals": a.goals,
        "assists": a.assists,
        "minutes_played": a.minutes,
        "player_name": player_name(Some(a.player_id)),
        "club_name": club_name(a.club_id),
    }))
}

pub fn sql_rows(query: &str, params: &RequestParams) -> Vec<RawRow> {
    match query {
        "top_scorers" => {
            let ranked = scorers(text(params, "competition_id"), int(params, "season"));
            window(ranked, params)
                .into_iter()
                .map(|(player_id, club_id, goals)| {
                    raw(json!({
                        "player_id": player_id,
                        "player_name": player_name(Some(player_id)),
                        "image_url": image_url(player_id),
                        "goals": goals,
                        "club_name": club_name(club_id),
                    }))
                })
                .collect()
        }
        "player_form" => season_appearances(
            int(params, "player_id"),
            text(params, "competition_id"),
            int(params, "season"),
        )
        .into_iter()
        .take(limit(params, 5))
        .map(|a| {
            let g = game(a.game_id);
            raw(json!({
                "game_id": a.game_id,
                "date_str": g.date,
                "minutes_played": a.minutes,
                "goals": a.goals,
                "assists": a.assists,
                "player_club_id": a.club_id,
                "home_club_id": g.home,
                "home_name": club_name(g.home),
                "away_club_id": g.away,
                "away_name": club_name(g.away),
            }))
        })
        .collect(),
        "player_matches" => season_appearances(
            int(params, "player_id"),
            text(params, "competition_id"),
            int(params, "season"),
        )
        .into_iter()
        .take(limit(params, 10))
        .map(|a| {
            let g = game(a.game_id);
            raw(json!({
                "date_str": g.date,
                "competition_id": g.competition_id,
                "season": g.season,
                "minutes_played": a.minutes,
                "goals": a.goals,
                "assists": a.assists,
                "yellow_cards": a.yellow,
                "red_cards": a.red,
                "home_club_id": g.home,
                "home_name": club_name(g.home),
                "away_name": club_name(g.away),
                "away_club_id": g.away,
                "home_club_goals": g.home_goals,
                "away_club_goals": g.away_goals,
            }))
        })
        .collect(),
        "player_season_summary" => player_seasons(int(params, "player_id"))
            .into_iter()
            .map(|(competition_id, season, apps)| {
                raw(json!({
                    "competition_id": competition_id,
                    "season": season,
                    "apps": apps.len(),
                    "minutes": apps.iter().map(|a| a.minutes).sum::<i64>(),
                    "goals": apps.iter().map(|a| a.goals).sum::<i64>(),
                    "assists": apps.iter().map(|a| a.assists).sum::<i64>(),
                    "yellows": apps.iter().map(|a| a.yellow).sum::<i64>(),
                    "reds": apps.iter().map(|a| a.red).sum::<i64>(),
                }))
            })
            .collect(),
        "player_profile" => player(int(params, "player_id"))
            .map(|p| {
                raw(json!({
                    "player_id": p.id,
                    "name": p.name,
                    "position": p.position,
                    "sub_position": p.sub_position,
                    "current_club_id": p.club_id,
                    "current_club_name": club_name(p.club_id),
                    "market_value_eur": p.market_value,
                    "highest_market_value_eur": p.highest_market_value,
                    "image_url": image_url(p.id),
                    "height_in_cm": p.height_in_cm,
                    "dob": p.dob,
                    "country_of_citizenship": p.country,
                    "foot": p.foot,
                    "city_of_birth": p.city_of_birth,
                    "agent_name": p.agent_name,
                    "contract_expiration_date": p.contract_expiration_date,
                }))
            })
            .into_iter()
            .collect(),
        "appearances" => window(searched_appearances(params), params)
            .into_iter()
            .map(appearance_row)
            .collect(),
        "appearance" => {
            let id = text(params, "appearance_id");
            APPEARANCES
                .iter()
                .filter(|a| appearance_id(a) == id)
                .map(appearance_row)
                .collect()
        }
        "match" => GAMES
            .iter()
            .filter(|g| g.id == int(params, "game_id"))
            .map(|g| {
                raw(json!({
                    "game_id": g.id,
                    "competition_id": g.competition_id,
                    "season": g.season,
                    "round": g.round,
                    "date_str": g.date,
                    "home_club_id": g.home,
                    "home_name": club_name(g.home),
                    "home_club_goals": g.home_goals,
                    "home_club_formation": formation(g.home_formation),
                    "away_club_id": g.away,
                    "away_name": club_name(g.away),
                    "away_club_goals": g.away_goals,
                    "away_club_formation": formation(g.away_formation),
                    "stadium": g.stadium,
                    "attendance": g.attendance,
                    "referee": g.referee,
                }))
            })
            .collect(),
        "match_events" => {
            let game_id = int(params, "game_id");
            events(game_id)
                .into_iter()
                .map(|(_, e)| {
                    let side = if e.club_id == game(game_id).home { "home" } else { "away" };
                    raw(json!({
                        "game_id": e.game_id,
                        "minute": e.minute,
                        "event_type": e.kind,
                        "club_id": e.club_id,
                        "side": side,
                        "player_id": e.player_id,
                        "player_name": player_name(Some(e.player_id)),
                        "player_assist_id": e.assist_id,
                        "assist_name": player_name(e.assist_id),
                        "player_in_id": e.player_in_id,
                        "player_in_name": player_name(e.player_in_id),
                        "description": e.description,
                    }))
                })
                .collect()
        }
        "club_roi" => club_roi(params)
            .into_iter()
            .map(|r| {
                raw(json!({
                    "player_id": r.transfer.player_id,
                    "player_name": player_name(Some(r.transfer.player_id)),
                    "transfer_season": r.transfer.season,
                    "transfer_fee": r.transfer.fee,
                    "market_value_in_eur": r.transfer.market_value,
                    "post_minutes": r.minutes,
                    "post_goals": r.goals,
                    "post_assists": r.assists,
                    "eur_per_minutes": decimal(r.per_minute()),
                    "eur_per_contrib": decimal(r.per_contribution()),
                }))
            })
            .collect(),
        other => panic!("no relational fixture for {other}"),
    }
}

pub fn sql_total(query: &str, params: &RequestParams) -> u64 {
    match query {
        "top_scorers" => scorers(text(params, "competition_id"), int(params, "season")).len() as u64,
        "appearances" => searched_appearances(params).len() as u64,
        other => panic!("{other} has no count statement"),
    }
}

// ---- document rendering ----

/// (competition_id, season, appearances newest first) per season played,
/// latest season first.
fn player_seasons(player_id: i64) -> Vec<(&'static str, i64, Vec<&'static Appearance>)> {
    let mut keys: Vec<(&'static str, i64)> = Vec::new();
    for a in APPEARANCES.iter().filter(|a| a.player_id == player_id) {
        let g = game(a.game_id);
        if !keys.contains(&(g.competition_id, g.season)) {
            keys.push((g.competition_id, g.season));
        }
    }
    keys.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    keys.into_iter()
        .map(|(comp, season)| (comp, season, season_appearances(player_id, comp, season)))
        .collect()
}

fn team_doc(club_id: i64, goals: i64, formation: &str) -> Document {
    doc! { "club_id": club_id, "name": club_name(club_id), "goals": goals, "formation": formation }
}

fn game_doc(g: &Game) -> Document {
    let events: Vec<Bson> = EVENTS
        .iter()
        .filter(|e| e.game_id == g.id)
        .map(|e| {
            Bson::Document(doc! {
                "minute": e.minute,
                "type": e.kind,
                "club_id": e.club_id,
                "player_id": e.player_id,
                "sub_in_id": e.player_in_id,
                "assist_id": e.assist_id,
                "event_desc": e.description,
            })
        })
        .collect();
    doc! {
        "_id": g.id,
        "date": g.date,
        "competition_id": g.competition_id,
        "season": g.season,
        "round": g.round,
        "home": team_doc(g.home, g.home_goals, g.home_formation),
        "away": team_doc(g.away, g.away_goals, g.away_formation),
        "stadium": g.stadium,
        "attendance": g.attendance,
        "referee": g.referee,
        "events": events,
    }
}

fn appearance_doc(a: &Appearance) -> Document {
    let id = appearance_id(a);
    doc! {
        "_id": id.clone(),
        "appearance_id": id,
        "game_id": a.game_id,
        "player_id": a.player_id,
        "club_id": a.club_id,
        "player_current_club_id": player(a.player_id).map(|p| p.club_id),
        "date": game(a.game_id).date,
        "min": a.minutes,
        "g": a.goals,
        "a": a.assists,
        "yc": a.yellow,
        "rc": a.red,
        "player_name": player_name(Some(a.player_id)),
        "club_name": club_name(a.club_id),
    }
}

fn player_doc(p: &Player) -> Document {
    doc! {
        "player_id": p.id,
        "name": p.name,
        "position": p.position,
        "sub_position": p.sub_position,
        "current_club_id": p.club_id,
        "current_club_name": club_name(p.club_id),
        "market_value_eur": p.market_value,
        "highest_market_value_eur": p.highest_market_value,
        "image_url": image_url(p.id),
        "height_in_cm": p.height_in_cm,
        "dob": p.dob,
        "country_of_citizenship": p.country,
        "foot": p.foot,
        "city_of_birth": p.city_of_birth,
        "agent_name": p.agent_name,
        "contract_expiration_date": p.contract_expiration_date,
    }
}

fn latest_match(a: &Appearance) -> Bson {
    let g = game(a.game_id);
    Bson::Document(doc! {
        "game_id": g.id,
        "date": g.date,
        "min": a.minutes,
        "g": a.goals,
        "a": a.assists,
        "yc": a.yellow,
        "rc": a.red,
        "home": { "club_id": g.home, "name": club_name(g.home), "goals": g.home_goals },
        "away": { "club_id": g.away, "name": club_name(g.away), "goals": g.away_goals },
    })
}

fn player_season_doc(player_id: i64, competition_id: &str, season: i64, apps: &[&Appearance]) -> Document {
    let sum = |f: fn(&Appearance) -> i64| apps.iter().map(|a| f(a)).sum::<i64>();
    doc! {
        "_id": format!("{}_{}_{}", player_id, competition_id, season),
        "player_id": player_id,
        "competition_id": competition_id,
        "season": season,
        "totals": {
            "apps": apps.len() as i64,
            "minutes": sum(|a| a.minutes),
            "goals": sum(|a| a.goals),
            "assists": sum(|a| a.assists),
            "yc": sum(|a| a.yellow),
            "rc": sum(|a| a.red),
        },
        "latest_matches": apps.iter().take(10).map(|a| latest_match(a)).collect::<Vec<_>>(),
    }
}

/// What each catalog pipeline or find hands back, before a trailing
/// `$project` or find projection is applied.
pub fn documents(query: &str, params: &RequestParams) -> Vec<Document> {
    match query {
        "top_scorers" => {
            let competition_id = text(params, "competition_id");
            let season = int(params, "season");
            let ranked = scorers(competition_id, season);
            window(ranked, params)
                .into_iter()
                .map(|(player_id, _, _)| {
                    let apps = season_appearances(player_id, competition_id, season);
                    let mut d = player_season_doc(player_id, competition_id, season, &apps);
                    if let Some(p) = player(player_id) {
                        d.insert("player", player_doc(p));
                    }
                    d
                })
                .collect()
        }
        "player_form" => season_appearances(
            int(params, "player_id"),
            text(params, "competition_id"),
            int(params, "season"),
        )
        .into_iter()
        .take(limit(params, 5))
        .map(|a| {
            let mut d = appearance_doc(a);
            d.insert("game", game_doc(game(a.game_id)));
            d
        })
        .collect(),
        "player_matches" => {
            let player_id = int(params, "player_id");
            let competition_id = text(params, "competition_id");
            let season = int(params, "season");
            let apps = season_appearances(player_id, competition_id, season);
            let stored = player_season_doc(player_id, competition_id, season, &apps);
            stored
                .get_array("latest_matches")
                .expect("latest_matches")
                .iter()
                .take(limit(params, 10))
                .filter_map(Bson::as_document)
                .map(|m| {
                    let mut merged = m.clone();
                    merged.insert("competition_id", competition_id);
                    merged.insert("season", season);
                    merged
                })
                .collect()
        }
        "player_season_summary" => {
            let player_id = int(params, "player_id");
            player_seasons(player_id)
                .into_iter()
                .map(|(comp, season, apps)| player_season_doc(player_id, comp, season, &apps))
                .collect()
        }
        "player_profile" => player(int(params, "player_id")).map(player_doc).into_iter().collect(),
        "appearances" => window(searched_appearances(params), params)
            .into_iter()
            .map(appearance_doc)
            .collect(),
        "appearance" => {
            let id = text(params, "appearance_id");
            APPEARANCES
                .iter()
                .filter(|a| appearance_id(a) == id)
                .take(1)
                .map(appearance_doc)
                .collect()
        }
        "match" => GAMES
            .iter()
            .filter(|g| g.id == int(params, "game_id"))
            .map(game_doc)
            .collect(),
        "match_events" => {
            let game_id = int(params, "game_id");
            events(game_id)
                .into_iter()
                .map(|(seq, e)| {
                    let side = if e.club_id == game(game_id).home { "home" } else { "away" };
                    let mut d = doc! {
                        "minute": e.minute,
                        "type": e.kind,
                        "club_id": e.club_id,
                        "player_id": e.player_id,
                        "sub_in_id": e.player_in_id,
                        "assist_id": e.assist_id,
                        "event_desc": e.description,
                        "game_id": game_id,
                        "seq": seq as i64,
                        "side": side,
                    };
                    for (field, id) in [
                        ("player_name", Some(e.player_id)),
                        ("assist_name", e.assist_id),
                        ("player_in_name", e.player_in_id),
                    ] {
                        if let Some(name) = player_name(id) {
                            d.insert(field, name);
                        }
                    }
                    d
                })
                .collect()
        }
        "club_roi" => club_roi(params)
            .into_iter()
            .map(|r| {
                let per = |v: Option<f64>| v.map_or(Bson::Null, Bson::Double);
                doc! {
                    "player_id": r.transfer.player_id,
                    "player_name": player_name(Some(r.transfer.player_id)),
                    "transfer_season": r.transfer.season,
                    "transfer_fee": r.transfer.fee,
                    "market_value_in_eur": r.transfer.market_value,
                    "post_minutes": r.minutes,
                    "post_goals": r.goals,
                    "post_assists": r.assists,
                    "eur_per_minutes": per(r.per_minute()),
                    "eur_per_contrib": per(r.per_contribution()),
                }
            })
            .collect(),
        other => panic!("no document fixture for {other}"),
    }
}

pub fn document_total(query: &str, params: &RequestParams) -> u64 {
    sql_total(query, params)
}

/// Apply a find or `$project` projection: inclusion keeps the named
/// top-level fields (and `_id` unless excluded), exclusion drops them.
pub fn project(document: Document, projection: &Document) -> Document {
    let included = |v: &Bson| !matches!(v, Bson::Int32(0) | Bson::Int64(0) | Bson::Boolean(false));
    let inclusions: Vec<&str> = projection
        .iter()
        .filter(|(k, v)| k.as_str() != "_id" && included(*v))
        .map(|(k, _)| k.split('.').next().unwrap_or(k))
        .collect();
    let keeps = |k: &str| projection.get(k).is_none_or(included);
    if inclusions.is_empty() {
        return document.into_iter().filter(|(k, _)| keeps(k.as_str())).collect();
    }
    document
        .into_iter()
        .filter(|(k, _)| if k == "_id" { keeps(k.as_str()) } else { inclusions.contains(&k.as_str()) })
        .collect()
}

/// A service whose two fakes answer `query` from this fixture.
pub fn seeded_service(query: &'static str, params: &RequestParams) -> QueryService {
    let sql_params = params.clone();
    let primary: SqlResponder = Arc::new(move |sql: &str, _: &[SqlParam]| -> Result<Vec<RawRow>, String> {
        if sql.contains("COUNT(*) AS total") {
            return Ok(vec![raw(json!({ "total": sql_total(query, &sql_params) }))]);
        }
        Ok(sql_rows(query, &sql_params))
    });

    let doc_params = params.clone();
    let respond: DocResponder = Arc::new(move |op: &DocumentOperation| -> Result<DocumentOutput, String> {
        let projection = match op {
            DocumentOperation::Count { .. } => {
                return Ok(DocumentOutput::Count(document_total(query, &doc_params)));
            }
            DocumentOperation::Find(spec) => spec.projection.clone(),
            DocumentOperation::Aggregate { pipeline, .. } => pipeline
                .last()
                .and_then(|stage| stage.get_document("$project").ok())
                .cloned(),
        };
        let docs = documents(query, &doc_params);
        Ok(DocumentOutput::Documents(match projection {
            Some(p) => docs.into_iter().map(|d| project(d, &p)).collect(),
            None => docs,
        }))
    });

    QueryService::new(
        Arc::new(FakeSql::new(SqlScript {
            primary,
            ..SqlScript::default()
        })),
        Arc::new(FakeDocuments::with_responder(respond, None)),
    )
}
