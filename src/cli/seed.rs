use anyhow::Result;
use chrono::Utc;

use flowfriend::tracking::seed::{seed_demo_month, DEMO_USER_ID};

use super::AppContext;

/// Write the demo month. Goes to the demo identity unless `current_user` is
/// set, in which case the signed-in user gets it.
pub async fn seed(ctx: &AppContext, current_user: bool) -> Result<()> {
    let user_id = if current_user {
        ctx.user_id.clone()
    } else {
        DEMO_USER_ID.to_string()
    };

    let today = Utc::now().date_naive();
    let target = user_id.clone();
    let written = ctx
        .store
        .with_conn(move |conn| seed_demo_month(conn, &target, today))
        .await?;

    println!("Seeded {written} entries for {user_id}.");
    Ok(())
}
