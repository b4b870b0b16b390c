use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::core::time::{now_utc, time_ago};
use crate::core::types::{DistressSignal, Report, Tip};
use crate::insights::heatmap::HeatmapView;
use crate::insights::DashboardSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Markdown,
}

pub trait MarkdownRender {
    fn markdown(&self) -> String;
}

pub fn render_many<T: Serialize + MarkdownRender>(
    title: &str,
    items: &[T],
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        OutputFormat::Jsonl => {
            let mut lines = String::new();
            for item in items {
                lines.push_str(&serde_json::to_string(item)?);
                lines.push('\n');
            }
            Ok(lines)
        }
        OutputFormat::Markdown => {
            let mut out = format!("# {}\n\n", title);
            if items.is_empty() {
                out.push_str("_Nothing to show._\n");
            }
            for item in items {
                out.push_str(&item.markdown());
                out.push('\n');
            }
            Ok(out)
        }
    }
}

pub fn render_one<T: Serialize + MarkdownRender>(item: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(item)?),
        OutputFormat::Jsonl => Ok(format!("{}\n", serde_json::to_string(item)?)),
        OutputFormat::Markdown => Ok(item.markdown()),
    }
}

pub fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, text)?;
            tracing::info!("output written to {}", path.display());
        }
        None => println!("{}", text.trim_end()),
    }
    Ok(())
}

impl MarkdownRender for Report {
    fn markdown(&self) -> String {
        let mut out = format!("## {} {} [{}]\n", self.id, self.category, self.status);
        out.push_str(&format!(
            "- Reported: {} ({}) by {}\n- Location: {}\n",
            self.created_at.to_rfc3339(),
            time_ago(self.created_at, now_utc()),
            self.reporter.display_name(),
            self.location_label()
        ));
        if let Some(loc) = &self.location {
            out.push_str(&format!("- Coordinates: {}\n", loc.label()));
        }
        out.push_str(&format!("- Description: {}\n", self.description));
        if !self.media_urls.is_empty() {
            out.push_str(&format!("- Media: {}\n", self.media_urls.join(", ")));
        }
        if let Some(diary) = &self.diary {
            out.push_str(&format!("- Case diary: {} ({:?})\n", diary.uri, diary.kind));
        }
        out
    }
}

impl MarkdownRender for DistressSignal {
    fn markdown(&self) -> String {
        let mut out = format!("## {} [{}]\n", self.id, self.status);
        out.push_str(&format!(
            "- Raised: {} ({})\n- Caller: {} / {}\n- Location: {}\n",
            self.created_at.to_rfc3339(),
            time_ago(self.created_at, now_utc()),
            self.contact.name,
            self.contact.phone,
            self.location_label
        ));
        if let Some(at) = self.dispatched_at {
            out.push_str(&format!("- Dispatched: {}\n", at.to_rfc3339()));
        }
        if let Some(at) = self.responded_at {
            out.push_str(&format!("- Responded: {}\n", at.to_rfc3339()));
        }
        out
    }
}

impl MarkdownRender for Tip {
    fn markdown(&self) -> String {
        format!(
            "- {} (by {}, votes {:+}, {})\n",
            self.text,
            self.author.display_name(),
            self.tally,
            self.id
        )
    }
}

impl MarkdownRender for DashboardSummary {
    fn markdown(&self) -> String {
        let mut out = String::from("# Command Center\n\n");
        out.push_str(&format!("Generated: {}\n\n", self.generated_at.to_rfc3339()));
        out.push_str(&format!(
            "| Total reports | Pending | Investigating | Resolved | Active SOS | Dispatched |\n|---|---|---|---|---|---|\n| {} | {} | {} | {} | {} | {} |\n\n",
            self.total_reports,
            self.pending,
            self.investigating,
            self.resolved,
            self.active_signals,
            self.dispatched_signals
        ));
        if !self.by_category.is_empty() {
            let counts: Vec<String> = self
                .by_category
                .iter()
                .map(|(c, n)| format!("{}: {}", c, n))
                .collect();
            out.push_str(&format!("By category: {}\n\n", counts.join(", ")));
        }
        out.push_str("## Active SOS\n\n");
        if self.active_alerts.is_empty() {
            out.push_str("_No active alerts._\n");
        }
        for alert in &self.active_alerts {
            out.push_str(&format!(
                "- {} at {} ({})\n",
                alert.id,
                alert.location_label,
                time_ago(alert.created_at, self.generated_at)
            ));
        }
        out.push_str("\n## Recent reports\n\n");
        for report in &self.recent_reports {
            out.push_str(&format!(
                "- {} {} [{}] {}\n",
                report.id,
                report.category,
                report.status,
                report.location_label()
            ));
        }
        out
    }
}

impl MarkdownRender for HeatmapView {
    fn markdown(&self) -> String {
        let mut out = String::from("# Hotspots\n\n");
        out.push_str(&format!(
            "Window: {} .. {}\n\nIncidents: {} across {} areas\n\n",
            self.window_start.to_rfc3339(),
            self.window_end.to_rfc3339(),
            self.points.len(),
            self.distinct_regions
        ));
        for p in &self.points {
            out.push_str(&format!(
                "- {:.5},{:.5} {} ({})\n",
                p.latitude, p.longitude, p.category, p.region
            ));
        }
        out
    }
}
