//! Cache Command
//!
//! Inspects or clears the per-workspace analysis record.

use std::path::Path;

use console::style;

use crate::cache::AnalysisCache;
use crate::config::ConfigLoader;
use crate::scanner::{TreeScanner, format_tree};
use crate::types::Result;

/// Show whether a record exists and whether it is still valid for the
/// workspace's current structure
pub async fn status(path: &Path) -> Result<()> {
    let config = ConfigLoader::load()?;
    let cache = AnalysisCache::for_workspace(path).with_file_name(&config.cache.file_name);

    let Some(record) = cache.peek().await else {
        println!("No analysis cache for this workspace.");
        return Ok(());
    };

    println!("{} Analysis cache record", style("✓").green());
    println!("  Hash:     {}", record.codebase_hash);
    println!("  Features: {}", record.features.join(", "));
    println!("  Files:    {} snapshot(s)", record.file_contents.len());
    println!("  Saved:    {}", record.timestamp.format("%Y-%m-%d %H:%M UTC"));

    // Re-derive the current hash to report validity
    let entries = TreeScanner::new(path)
        .with_ignore_file(&config.scan.ignore_file)
        .with_cache_file_name(&config.cache.file_name)
        .scan()?;
    let root_name = path
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "workspace".to_string());
    let current = AnalysisCache::hash(&format_tree(&entries, &root_name));

    if record.codebase_hash == current {
        println!("  Status:   valid for the current structure");
    } else {
        println!("  Status:   {} (structure changed)", style("stale").yellow());
    }

    Ok(())
}

pub async fn clear(path: &Path) -> Result<()> {
    let config = ConfigLoader::load()?;
    let cache = AnalysisCache::for_workspace(path).with_file_name(&config.cache.file_name);

    if cache.clear().await? {
        println!("{} Cleared analysis cache", style("✓").green());
    } else {
        println!("No cache record to clear.");
    }
    Ok(())
}
