use std::sync::Arc;

use anyhow::{Context, Result};

use wordloop_lib::reminders::LogDispatcher;
use wordloop_lib::vocabulary::OwnerId;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(
    app: &App,
    owner: &str,
    word: &str,
    definition: &str,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let engine = app.engine(Arc::new(LogDispatcher));
    let enrollment = engine
        .enroll(&OwnerId::new(owner), word, definition)
        .with_context(|| format!("Failed to add '{}'", word.trim()))?;

    match format {
        OutputFormat::Json => {
            let scheduled: Vec<serde_json::Value> = enrollment
                .burst
                .scheduled
                .iter()
                .map(|(stage, job_id)| {
                    serde_json::json!({
                        "stage": stage.label(),
                        "jobId": job_id.to_string(),
                    })
                })
                .collect();
            let failed: Vec<&str> = enrollment
                .burst
                .failures
                .iter()
                .map(|f| f.stage.label())
                .collect();

            let output = serde_json::json!({
                "entryId": enrollment.entry_id.to_string(),
                "owner": owner,
                "word": word.trim(),
                "burstId": enrollment.burst.burst_id.to_string(),
                "scheduled": scheduled,
                "failed": failed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "{} {} for {}",
                paint("Saved", Color::GREEN, use_color),
                paint(word.trim(), Color::BOLD, use_color),
                owner
            );
            for (stage, job_id) in &enrollment.burst.scheduled {
                println!("  {:<4} {}", stage.label(), paint(&job_id.to_string(), Color::DIM, use_color));
            }
            for failure in &enrollment.burst.failures {
                println!(
                    "  {:<4} {}",
                    failure.stage.label(),
                    paint(&format!("not scheduled: {}", failure.source), Color::YELLOW, use_color)
                );
            }
        }
    }

    Ok(())
}
