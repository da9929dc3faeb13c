use anyhow::{bail, Result};

use flowfriend::tracking::identity;

use super::AppContext;

/// Show the profile, saving `name` / `avg_cycle_length` first when given.
pub async fn profile(
    ctx: &AppContext,
    name: Option<String>,
    avg_cycle_length: Option<u32>,
) -> Result<()> {
    if let Some(days) = avg_cycle_length {
        if !(1..=90).contains(&days) {
            bail!("cycle length must be between 1 and 90 days");
        }
    }

    let user_id = ctx.user_id.clone();
    let changed = name.is_some() || avg_cycle_length.is_some();
    let user = ctx
        .store
        .with_conn(move |conn| {
            if changed {
                identity::save_user(conn, &user_id, name.as_deref(), avg_cycle_length).map(Some)
            } else {
                identity::get_user(conn, &user_id)
            }
        })
        .await?;

    let Some(user) = user else {
        bail!("no profile for {}", ctx.user_id);
    };
    if changed {
        println!("Profile saved.");
    }
    println!("User ID:        {}", user.id);
    println!("Name:           {}", user.name.as_deref().unwrap_or("(not set)"));
    println!("Average cycle:  {} days", user.avg_cycle_length);
    println!("Member since:   {}", user.created_at);
    Ok(())
}
