use anyhow::Result;

use flowfriend::tracking::{EntrySink, NewEntry};

use super::AppContext;

/// Append a manual entry for the signed-in user and echo it back.
pub async fn log(ctx: &AppContext, entry: NewEntry) -> Result<()> {
    let stored = ctx.store.append(&ctx.user_id, entry).await?;

    println!("Logged entry {} for {}", stored.id, stored.date());
    println!("  Flow:   {}", stored.flow.label());
    println!("  Mood:   {}", stored.mood.label());
    println!("  Pain:   {}", stored.pain.label());
    println!("  Sleep:  {}", stored.sleep.label());
    Ok(())
}
