//! Offline commands: `summarize`, `tag`, `color`.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use realm_core::color::ColorCache;
use realm_core::summary::summarize;
use realm_core::tags::sanitize_tag;

/// Read a file, or stdin when `input` is `-`.
pub fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))
}

pub fn run_summarize(input: &Path) -> Result<()> {
    let markdown = read_input(input)?;
    let summary = summarize(&markdown);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub fn run_tag(names: &[String]) -> Result<()> {
    for name in names {
        println!("{}\t{}", name, sanitize_tag(name));
    }
    Ok(())
}

pub fn run_color(labels: &[String]) -> Result<()> {
    let mut colors = ColorCache::new();
    for label in labels {
        println!("{}\t{}", label, colors.color(label));
    }
    Ok(())
}
