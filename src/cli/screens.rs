//! Home and tracker screens.
//!
//! Tracker screens render the recent entries as a grid of `MM-DD glyph`
//! cells under a legend. With `follow` they stay open on a live
//! [`EntryQuery`] and redraw whenever the view changes.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;

use flowfriend::tracking::identity::{self, AuthState};
use flowfriend::tracking::{EntriesView, Entry, EntryQuery, EntrySource, Flow, Mood, Pain, Sleep};

use super::AppContext;

const CELLS_PER_ROW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracker {
    Flow,
    Pain,
    Sleep,
    Mood,
}

impl Tracker {
    fn title(self) -> &'static str {
        match self {
            Self::Flow => "FLOW",
            Self::Pain => "PAIN",
            Self::Sleep => "SLEEP",
            Self::Mood => "MOOD",
        }
    }

    fn legend(self) -> Vec<(&'static str, &'static str)> {
        fn pairs<T: Copy>(
            all: &[T],
            glyph: fn(&T) -> &'static str,
            label: fn(&T) -> &'static str,
        ) -> Vec<(&'static str, &'static str)> {
            all.iter().map(|v| (glyph(v), label(v))).collect()
        }
        match self {
            Self::Flow => pairs(Flow::ALL, Flow::glyph, Flow::label),
            Self::Pain => pairs(Pain::ALL, Pain::glyph, Pain::label),
            Self::Sleep => pairs(Sleep::ALL, Sleep::glyph, Sleep::label),
            Self::Mood => pairs(Mood::ALL, Mood::glyph, Mood::label),
        }
    }

    fn glyph(self, entry: &Entry) -> &'static str {
        match self {
            Self::Flow => entry.flow.glyph(),
            Self::Pain => entry.pain.glyph(),
            Self::Sleep => entry.sleep.glyph(),
            Self::Mood => entry.mood.glyph(),
        }
    }
}

/// Render one tracker screen for a view.
pub fn render_tracker(tracker: Tracker, view: &EntriesView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", tracker.title());
    let _ = writeln!(out, "{}", "=".repeat(tracker.title().len()));

    if view.loading {
        let _ = writeln!(out, "loading...");
        return out;
    }

    let legend: Vec<String> = tracker
        .legend()
        .into_iter()
        .map(|(glyph, label)| format!("{glyph} {label}"))
        .collect();
    let _ = writeln!(out, "{}", legend.join("   "));
    let _ = writeln!(out);

    if view.entries.is_empty() {
        let _ = writeln!(
            out,
            "No entries yet. Log one with `flowfriend log` or run `flowfriend seed`."
        );
        return out;
    }

    for row in view.entries.chunks(CELLS_PER_ROW) {
        let cells: Vec<String> = row
            .iter()
            .map(|entry| format!("{} {}", entry.date().format("%m-%d"), tracker.glyph(entry)))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  "));
    }
    out
}

/// Print a tracker screen, optionally following live changes until ctrl-c.
pub async fn tracker(ctx: &AppContext, tracker: Tracker, limit: usize, follow: bool) -> Result<()> {
    let auth = AuthState::signed_in(ctx.user_id.clone());
    let refresh = ctx.config.tracking.refresh_interval();
    let mut query = EntryQuery::subscribe_with_refresh(
        Arc::new(ctx.store.clone()),
        auth.subscribe(),
        limit,
        refresh,
    );

    let view = query.ready().await;
    print!("{}", render_tracker(tracker, &view));
    if !follow {
        return Ok(());
    }

    println!();
    println!("(following, ctrl-c to stop)");
    let mut updates = query.view();
    updates.mark_unchanged();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                println!();
                print!("{}", render_tracker(tracker, &view));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    query.unsubscribe();
    Ok(())
}

/// The home screen: who is signed in, the latest entry, and where to go.
pub async fn home(ctx: &AppContext) -> Result<()> {
    let user_id = ctx.user_id.clone();
    let user = ctx
        .store
        .with_conn(move |conn| identity::get_user(conn, &user_id))
        .await?;
    let total = ctx.store.count(&ctx.user_id).await?;
    let latest = ctx.store.recent(&ctx.user_id, 1).await?;

    println!("FlowFriend");
    println!("WITH YOUR CYCLE COMPANION, FLOPPY!");
    println!();
    match user.as_ref().and_then(|u| u.name.as_deref()) {
        Some(name) => println!("Hi, {name}!"),
        None => println!("Hi there! Set a name with `flowfriend profile --name <NAME>`."),
    }
    if let Some(user) = &user {
        println!("Average cycle:     {} days", user.avg_cycle_length);
    }
    println!("Entries logged:    {total}");
    if let Some(entry) = latest.first() {
        println!(
            "Latest ({}):  flow {}, mood {}, pain {}, sleep {}",
            entry.date(),
            entry.flow.label(),
            entry.mood.label(),
            entry.pain.label(),
            entry.sleep.label(),
        );
    }
    println!();
    println!("  flowfriend flow      Flow tracker");
    println!("  flowfriend pain      Pain tracker");
    println!("  flowfriend sleep     Sleep tracker");
    println!("  flowfriend mood      Mood tracker");
    println!("  flowfriend predict   🔮 Cycle prediction");
    println!("  flowfriend chat      💬 Health chat");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use flowfriend::tracking::Source;

    fn entry(day: u32, pain: Pain) -> Entry {
        Entry {
            id: format!("e{day}"),
            user_id: "u".into(),
            flow: Flow::NotRecorded,
            mood: Mood::NotRecorded,
            pain,
            sleep: Sleep::NotRecorded,
            recorded_at: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                .and_utc(),
            source: Source::Manual,
            device_timestamp: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn loading_view_renders_placeholder() {
        let view = EntriesView {
            entries: vec![],
            loading: true,
        };
        let out = render_tracker(Tracker::Pain, &view);
        assert!(out.starts_with("PAIN\n====\n"));
        assert!(out.contains("loading..."));
    }

    #[test]
    fn grid_wraps_every_seven_cells() {
        let entries: Vec<Entry> = (1..=9).rev().map(|d| entry(d, Pain::StomachCramps)).collect();
        let view = EntriesView { entries, loading: false };
        let out = render_tracker(Tracker::Pain, &view);

        assert!(out.contains("~ Cramps"));
        assert!(out.contains("? No Data"));
        let grid: Vec<&str> = out.lines().filter(|l| l.starts_with("03-")).collect();
        assert_eq!(grid.len(), 2);
        assert!(grid[0].starts_with("03-09 ~"));
        assert_eq!(grid[1], "03-02 ~  03-01 ~");
    }

    #[test]
    fn empty_view_suggests_logging() {
        let view = EntriesView {
            entries: vec![],
            loading: false,
        };
        assert!(render_tracker(Tracker::Flow, &view).contains("No entries yet"));
    }
}
