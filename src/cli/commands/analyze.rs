//! Analyze Command
//!
//! Runs the full two-stage pipeline against a workspace and prints (or
//! writes) the polished markdown. Pipeline step events render as styled
//! progress lines while the analysis runs.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;

use crate::ai::OpenAiClient;
use crate::config::ConfigLoader;
use crate::pipeline::{Analyzer, StepEvent};
use crate::types::Result;

pub struct AnalyzeOptions {
    pub path: PathBuf,
    /// Write markdown here instead of stdout
    pub output: Option<PathBuf>,
    /// Drop any existing cache record before analyzing
    pub refresh: bool,
    pub model: Option<String>,
}

pub async fn run(options: AnalyzeOptions) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(model) = options.model {
        config.llm.model = Some(model);
    }

    let client = Arc::new(OpenAiClient::new(config.llm.clone())?);
    let analyzer = Analyzer::new(&options.path, client, &config);

    if options.refresh && analyzer.cache().clear().await? {
        println!("{} Cleared previous analysis cache", style("✓").green());
    }

    let mut events = analyzer.reporter().subscribe();
    let renderer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                StepEvent::Step { description } => {
                    println!("{} {}", style("→").cyan(), description);
                }
                StepEvent::ScanProgress { entries } => {
                    println!("  {} entries scanned", style(entries).dim());
                }
                StepEvent::Finished { from_cache } => {
                    if from_cache {
                        println!("{} Structure analysis served from cache", style("✓").green());
                    }
                }
            }
        }
    });

    let result = analyzer.analyze().await;
    // Dropping the analyzer closes the event channel so the renderer
    // task can finish before we print the result
    drop(analyzer);
    let _ = renderer.await;
    let result = result?;

    if !result.features.is_empty() {
        println!(
            "{} Detected: {}",
            style("✓").green(),
            result.features.join(", ")
        );
    }

    match options.output {
        Some(path) => {
            tokio::fs::write(&path, &result.markdown).await?;
            println!("{} Wrote analysis to {}", style("✓").green(), path.display());
        }
        None => {
            println!();
            println!("{}", result.markdown);
        }
    }

    Ok(())
}
