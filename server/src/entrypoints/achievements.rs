use lms_gamification_server::db::DB;
use rocket::{serde::json::Json, State};

use super::types::AchievementResponse;

#[utoipa::path(context_path = "/api/achievements", responses(
    (status = 200, description = "Get the active achievement catalog", body = Vec<AchievementResponse>)
))]
#[get("/")]
async fn get_achievements(db: &State<DB>) -> Option<Json<Vec<AchievementResponse>>> {
    let achievements = match db.get_achievement_catalog().await {
        Err(e) => {
            error!("Failed to get achievement catalog: {e:#}");
            return None;
        }
        Ok(value) => value,
    };

    Some(Json(achievements.into_iter().map(Into::into).collect()))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket.mount("/api/achievements", rocket::routes![get_achievements])
    })
}
