//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use flowfriend::config::FlowFriendConfig;
use flowfriend::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &FlowFriendConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `flowfriend home` or `flowfriend seed` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("FlowFriend Health Report");
    println!("========================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("Signed in as:      {}", report.current_user.as_deref().unwrap_or("(nobody yet)"));
    println!();
    println!("Model:");
    println!("  Provider:        {}", config.model.provider);
    println!("  Model:           {}", config.model.model);
    if config.model.api_key().is_some() {
        println!("  API key:         set");
    } else {
        println!("  API key:         MISSING (set {})", flowfriend::config::API_KEY_ENV);
    }
    println!();
    println!("Row counts:");
    println!("  Users:           {}", report.user_count);
    println!("  Entries:         {}", report.entry_count);
    println!("  From device:     {}", report.device_entry_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.flowfriend/flowfriend.db");
        println!("  2. Or move the damaged file aside and start fresh with `flowfriend seed`.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
