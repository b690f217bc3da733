use std::str::FromStr;

use lms_gamification_server::db::DB;
use rocket::{serde::json::Json, State};
use shared::{LeaderboardPeriod, LeaderboardScope};

use super::types::{LeaderboardEntryResponse, PaginatedResponse};
use crate::Config;

#[utoipa::path(context_path = "/leaderboard", responses(
    (status = 200, description = "Get the global points leaderboard", body = PaginatedLeaderboardResponse)
))]
#[get("/global?<period>&<page>&<limit>")]
async fn get_global_leaderboard(
    db: &State<DB>,
    config: &State<Config>,
    period: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
) -> Option<Json<PaginatedResponse<LeaderboardEntryResponse>>> {
    let period = match period {
        Some(value) => LeaderboardPeriod::from_str(&value).ok()?,
        None => LeaderboardPeriod::AllTime,
    };
    let scope = LeaderboardScope::global(period);
    let page = page.unwrap_or(0);
    let limit = limit.unwrap_or(config.default_page_size).max(1);

    let (records, total) = match db.get_leaderboard(&scope, page as i64, limit as i64).await {
        Err(e) => {
            error!("Failed to get leaderboard {scope}: {e:#}");
            return None;
        }
        Ok(value) => value,
    };
    Some(Json(PaginatedResponse::new(
        records.into_iter().map(Into::into).collect(),
        page + 1,
        limit,
        total as u64,
    )))
}

#[utoipa::path(context_path = "/leaderboard", responses(
    (status = 200, description = "Get a course leaderboard", body = PaginatedLeaderboardResponse)
))]
#[get("/course/<course_id>?<page>&<limit>")]
async fn get_course_leaderboard(
    db: &State<DB>,
    config: &State<Config>,
    course_id: i64,
    page: Option<u64>,
    limit: Option<u64>,
) -> Option<Json<PaginatedResponse<LeaderboardEntryResponse>>> {
    let scope = LeaderboardScope::course(course_id);
    let page = page.unwrap_or(0);
    let limit = limit.unwrap_or(config.default_page_size).max(1);

    let (records, total) = match db.get_leaderboard(&scope, page as i64, limit as i64).await {
        Err(e) => {
            error!("Failed to get leaderboard {scope}: {e:#}");
            return None;
        }
        Ok(value) => value,
    };
    Some(Json(PaginatedResponse::new(
        records.into_iter().map(Into::into).collect(),
        page + 1,
        limit,
        total as u64,
    )))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket.mount(
            "/leaderboard",
            rocket::routes![get_global_leaderboard, get_course_leaderboard],
        )
    })
}
