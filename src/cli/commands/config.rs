//! Config Command
//!
//! Usage:
//!   repolens config show [-f json]
//!   repolens config path
//!   repolens config init [--force]

use console::style;

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml = toml::to_string_pretty(&config)
            .map_err(|e| crate::types::LensError::Config(e.to_string()))?;
        println!("# Effective configuration (defaults + project file + env)\n");
        println!("{}", toml);
    }
    Ok(())
}

/// Show configuration file paths
pub fn path() -> Result<()> {
    let project = ConfigLoader::project_config_path();
    let marker = if project.exists() { "" } else { " (not created)" };
    println!("Project config: {}{}", project.display(), marker);
    println!("Env prefix:     REPOLENS_ (e.g. REPOLENS_LLM_MODEL)");
    Ok(())
}

/// Create the project config file
pub fn init(force: bool) -> Result<()> {
    let path = ConfigLoader::init_project(force)?;
    println!("{} Project configuration ready", style("✓").green());
    println!("  Config: {}", path.display());
    Ok(())
}
