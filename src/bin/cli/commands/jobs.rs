use anyhow::{Context, Result};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, owner: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let jobs: Vec<_> = app
        .scheduler
        .pending()
        .context("Failed to read pending reminder jobs")?
        .into_iter()
        .filter(|job| owner.map_or(true, |o| job.payload.owner_id.as_str() == o))
        .collect();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = jobs
                .iter()
                .map(|job| {
                    serde_json::json!({
                        "id": job.id.to_string(),
                        "fireTime": job.fire_time.to_rfc3339(),
                        "owner": job.payload.owner_id.as_str(),
                        "word": job.payload.word,
                        "stage": job.payload.stage.label(),
                        "burstId": job.payload.burst_id.to_string(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if jobs.is_empty() {
                println!("No pending reminders.");
                return Ok(());
            }

            let word_width = jobs
                .iter()
                .map(|j| j.payload.word.chars().count())
                .max()
                .unwrap_or(4)
                .clamp(4, 30);

            println!("{:<17} {:<5} {:<ww$} Owner", "Fires at", "Stage", "Word", ww = word_width);
            println!(
                "{} {} {} {}",
                "\u{2500}".repeat(17),
                "\u{2500}".repeat(5),
                "\u{2500}".repeat(word_width),
                "\u{2500}".repeat(5)
            );

            let now = app.clock.now();
            for job in &jobs {
                let when = job.fire_time.format("%Y-%m-%d %H:%M").to_string();
                let when = if job.fire_time <= now {
                    paint(&when, Color::YELLOW, use_color)
                } else {
                    paint(&when, Color::CYAN, use_color)
                };
                println!(
                    "{} {:<5} {:<ww$} {}",
                    when,
                    job.payload.stage.label(),
                    job.payload.word,
                    job.payload.owner_id,
                    ww = word_width
                );
            }

            println!("\n{} pending", jobs.len());
        }
    }

    Ok(())
}
