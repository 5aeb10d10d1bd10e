use std::sync::Arc;

use anyhow::{Context, Result};

use wordloop_lib::reminders::LogDispatcher;
use wordloop_lib::vocabulary::OwnerId;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, owner: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let engine = app.engine(Arc::new(LogDispatcher));
    let entries = engine
        .list(&OwnerId::new(owner))
        .with_context(|| format!("Failed to list words for {}", owner))?;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = entries
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "id": entry.id.to_string(),
                        "word": entry.word,
                        "definition": entry.definition,
                        "createdAt": entry.created_at.to_rfc3339(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if entries.is_empty() {
                println!("No words saved for {}.", owner);
                return Ok(());
            }

            for entry in &entries {
                println!(
                    "\u{2022} {} \u{2014} {}",
                    paint(&entry.word, Color::BOLD, use_color),
                    entry.definition
                );
            }
            println!("\n{} words total", entries.len());
        }
    }

    Ok(())
}
