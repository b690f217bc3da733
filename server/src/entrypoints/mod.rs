use rocket::fairing::AdHoc;

pub mod achievements;
pub mod gamification;
pub mod leaderboards;
pub mod types;
pub mod users;

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket
            .attach(gamification::stage())
            .attach(leaderboards::stage())
            .attach(users::stage())
            .attach(achievements::stage())
    })
}
