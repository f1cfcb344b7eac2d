//! Markdown manifest generation
//!
//! This module writes a human-readable manifest of a mirror: when and how it
//! was made, its statistics, the errors by kind, and every stored resource
//! with the file it was written to.

use crate::crawler::CrawlReport;
use crate::storage::ResourceStore;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Run metadata shown at the top of the manifest
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub seed: String,
    pub max_depth: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: Option<String>,
}

/// Writes the markdown manifest of a finished crawl
///
/// # Arguments
///
/// * `run` - Run metadata
/// * `report` - The crawl report
/// * `store` - The store the crawl wrote into
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the manifest
/// * `Err(io::Error)` - Failed to write it
pub fn generate_markdown_manifest(
    run: &RunInfo,
    report: &CrawlReport,
    store: &ResourceStore,
    output_path: &Path,
) -> io::Result<()> {
    let markdown = format_markdown_manifest(run, report, store);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats the manifest as markdown
pub fn format_markdown_manifest(
    run: &RunInfo,
    report: &CrawlReport,
    store: &ResourceStore,
) -> String {
    let stats = &report.stats;
    let mut md = String::new();

    md.push_str("# Site-Mirror Manifest\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", run.seed));
    md.push_str(&format!("- **Max Depth**: {}\n", run.max_depth));
    md.push_str(&format!("- **Started**: {}\n", run.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", run.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        stats.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Phase**: {}\n", report.phase));
    if let Some(hash) = &run.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!("- **Mirror Root**: {}\n\n", store.root().display()));

    md.push_str("## Statistics\n\n");
    md.push_str(&format!("- **Resources Saved**: {}\n", stats.resources_saved));
    md.push_str(&format!("- **Bytes Downloaded**: {}\n", stats.bytes_downloaded));
    md.push_str(&format!("- **Cache Hits**: {}\n", stats.cache_hits));
    md.push_str(&format!("- **Links Discovered**: {}\n", stats.links_discovered));
    md.push_str(&format!("- **Links Dropped**: {}\n", stats.links_dropped));
    md.push_str(&format!("- **Total Errors**: {}\n\n", report.error_count));

    if let Some(error) = &report.first_error {
        md.push_str("## Errors\n\n");
        md.push_str(&format!("First error: `{}`\n\n", error));

        if !stats.errors_by_kind.is_empty() {
            md.push_str("| Kind | Count |\n");
            md.push_str("|------|-------|\n");
            for (kind, count) in &stats.errors_by_kind {
                md.push_str(&format!("| {} | {} |\n", kind, count));
            }
            md.push('\n');
        }
    }

    let resources = store.resources();
    md.push_str(&format!("## Resources ({})\n\n", resources.len()));
    if resources.is_empty() {
        md.push_str("_No resources were stored._\n");
        return md;
    }

    md.push_str("| URL | File | Content-Type | Bytes | Links |\n");
    md.push_str("|-----|------|--------------|-------|-------|\n");
    for resource in &resources {
        let content_type = if resource.content_type.is_empty() {
            "-"
        } else {
            resource.content_type.as_str()
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            resource.url,
            resource.local_path.display(),
            content_type,
            resource.size(),
            store.links_of(&resource.key()).len()
        ));
    }

    md
}
