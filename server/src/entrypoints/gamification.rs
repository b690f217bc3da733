use lms_gamification_server::{db::DB, gamification};
use rocket::{http::Status, serde::json::Json, State};

use super::types::{AchievementResponse, CheckRequest, ScoreRequest};

#[utoipa::path(context_path = "/api/gamification", responses(
    (status = 200, description = "Evaluate a user event and award any newly satisfied achievements", body = Vec<AchievementResponse>)
))]
#[post("/check", data = "<request>")]
async fn check_achievements(
    db: &State<DB>,
    request: Json<CheckRequest>,
) -> Result<Json<Vec<AchievementResponse>>, Status> {
    let request = request.into_inner();
    match gamification::check_and_award(db, request.user_id, &request.event).await {
        Ok(awarded) => Ok(Json(awarded.into_iter().map(Into::into).collect())),
        Err(e) => {
            error!(
                "Failed to check achievements for user {}: {e:#}",
                request.user_id
            );
            Err(Status::InternalServerError)
        }
    }
}

#[utoipa::path(context_path = "/api/gamification", responses(
    (status = 204, description = "Record a course score for a user and re-rank that course's leaderboard")
))]
#[post("/score", data = "<request>")]
async fn update_score(db: &State<DB>, request: Json<ScoreRequest>) -> Status {
    let request = request.into_inner();
    match gamification::ranker::update_user_score(
        db,
        request.user_id,
        request.course_id,
        request.score,
    )
    .await
    {
        Ok(()) => Status::NoContent,
        Err(e) => {
            error!(
                "Failed to update score for user {} in course {}: {e:#}",
                request.user_id, request.course_id
            );
            Status::InternalServerError
        }
    }
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket.mount(
            "/api/gamification",
            rocket::routes![check_achievements, update_score],
        )
    })
}
