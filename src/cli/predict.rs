use anyhow::Result;
use chrono::Utc;
use indicatif::ProgressBar;
use std::time::Duration;

use flowfriend::advisory::{self, Advice};
use flowfriend::llm;
use flowfriend::tracking::EntrySource;

use super::AppContext;

const CONFIDENCE_BAR_WIDTH: usize = 20;

fn confidence_bar(confidence: f64) -> String {
    let filled = ((confidence.clamp(0.0, 1.0) * CONFIDENCE_BAR_WIDTH as f64).round()) as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(CONFIDENCE_BAR_WIDTH - filled))
}

/// Print the prediction screen: next period estimate plus wellness insights.
pub async fn predict(ctx: &AppContext) -> Result<()> {
    // Fails here, before any request, when the key is missing.
    let model = llm::create_model(&ctx.config.model)?;

    let entries = ctx
        .store
        .recent(&ctx.user_id, ctx.config.tracking.prediction_window)
        .await?;

    println!("CYCLE PREDICTION");
    println!("================");
    if entries.is_empty() {
        println!("Not enough data yet");
        println!("Track your flow for at least one cycle to enable predictions");
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Asking the model...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let today = Utc::now().date_naive();
    let result = advisory::advise(model.as_ref(), &entries, today).await;
    spinner.finish_and_clear();
    let Advice { prediction, insights } = result?;

    println!();
    match prediction {
        Some(p) => {
            println!("Next Period Estimate");
            println!("  Estimated start date:  {}", p.next_period_date);
            println!("  Days until period:     {}", p.days_until(today));
            println!("  Cycle length:          {} days", p.cycle_length);
            println!(
                "  Confidence:            {} {}%",
                confidence_bar(p.confidence),
                p.confidence_percent()
            );
            if !p.notes.is_empty() {
                println!();
                println!("Analysis");
                println!("  {}", p.notes);
            }
        }
        None => println!("No prediction available right now. Try again later."),
    }

    if !insights.is_empty() {
        println!();
        println!("Wellness Insights");
        println!("{insights}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bar_fills_proportionally() {
        assert_eq!(confidence_bar(0.0), format!("[{}]", "-".repeat(20)));
        assert_eq!(confidence_bar(1.0), format!("[{}]", "#".repeat(20)));
        assert_eq!(confidence_bar(0.5), format!("[{}{}]", "#".repeat(10), "-".repeat(10)));
        assert_eq!(confidence_bar(3.0), confidence_bar(1.0));
    }
}
