use lms_gamification_server::db::DB;
use rocket::{serde::json::Json, State};

use super::types::UserProfileResponse;

#[utoipa::path(context_path = "/api/users", responses(
    (status = 200, description = "Get a user's points, level, earned achievements and leaderboard places", body = UserProfileResponse)
))]
#[get("/<username>")]
async fn get_user(username: &str, db: &State<DB>) -> Option<Json<UserProfileResponse>> {
    let user = match db.get_user(username).await {
        Err(e) => {
            error!("Failed to get user {username}: {e:#}");
            return None;
        }
        Ok(value) => value?,
    };

    Some(Json(user.into()))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket.mount("/api/users", rocket::routes![get_user])
    })
}
