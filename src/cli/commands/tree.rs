//! Tree Command
//!
//! Prints the same deterministic directory rendering the pipeline hashes
//! and sends to the model, so cache behavior can be inspected offline.

use std::path::Path;

use crate::cache::AnalysisCache;
use crate::config::ConfigLoader;
use crate::scanner::{TreeScanner, format_tree};
use crate::types::Result;

pub fn run(path: &Path, show_hash: bool) -> Result<()> {
    let config = ConfigLoader::load()?;

    let entries = TreeScanner::new(path)
        .with_ignore_file(&config.scan.ignore_file)
        .with_cache_file_name(&config.cache.file_name)
        .scan()?;

    let root_name = path
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "workspace".to_string());

    let rendered = format_tree(&entries, &root_name);
    println!("{}", rendered);

    if show_hash {
        println!("hash: {}", AnalysisCache::hash(&rendered));
    }

    Ok(())
}
