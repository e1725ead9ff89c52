//! Human-readable and JSON rendering of previews and cleanup results.

use crate::categories::Category;
use crate::report::CleanupReport;
use crate::result::CleanupResult;
use crate::theme::Theme;
use bytesize::ByteSize;
use serde::Serialize;

const WIDTH: usize = 60;

fn size_human(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// Shorten long paths from the left, keeping the file name visible.
fn truncate_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars || max_chars < 4 {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - (max_chars - 3)).collect();
    format!("...{tail}")
}

pub fn print_preview(report: &CleanupReport, limit: usize) {
    println!();
    println!("{}", Theme::header("Cleanup Preview"));
    println!("{}", Theme::divider_bold(WIDTH));

    let summary = report.by_category();
    if summary.is_empty() {
        println!("{}", Theme::muted("No matching locations found."));
        return;
    }

    println!(
        "{} {} {}",
        Theme::primary(&pad("Category", 28)),
        Theme::primary(&pad("Items", 10)),
        Theme::primary("Size")
    );
    println!("{}", Theme::divider(WIDTH));
    for (category, totals) in &summary {
        println!(
            "{} {} {}",
            Theme::category(&pad(category.label(), 28)),
            Theme::value(&pad(&totals.items.to_string(), 10)),
            Theme::size(&size_human(totals.bytes))
        );
    }
    println!("{}", Theme::divider(WIDTH));
    println!(
        "{} {} {}",
        Theme::primary(&pad("Total", 28)),
        Theme::value(&pad(&report.total_items().to_string(), 10)),
        Theme::size(&size_human(report.total_bytes()))
    );

    if limit > 0 {
        let largest = report.largest(limit);
        if !largest.is_empty() {
            println!();
            println!("{}", Theme::primary("Largest items:"));
            for (category, item) in largest {
                println!(
                    "  {} {} {}",
                    Theme::size(&pad(&size_human(item.size_bytes), 10)),
                    Theme::muted(&pad(category.id(), 18)),
                    truncate_path(&item.path.display().to_string(), 70)
                );
            }
        }
    }
    println!();
}

pub fn print_result(result: &CleanupResult) {
    println!();
    let title = if result.dry_run {
        "Dry Run Results"
    } else {
        "Cleanup Results"
    };
    println!("{}", Theme::header(title));
    println!("{}", Theme::divider_bold(WIDTH));

    for (category, totals) in &result.categories {
        let mut line = format!(
            "{} {} {}",
            Theme::category(&pad(category.label(), 28)),
            Theme::value(&pad(&totals.files_deleted.to_string(), 10)),
            Theme::size(&size_human(totals.bytes_freed))
        );
        if totals.failed_entries > 0 {
            line.push_str(&format!(
                "  {}",
                Theme::warning(&format!("{} skipped", totals.failed_entries))
            ));
        }
        println!("{line}");
    }
    if !result.categories.is_empty() {
        println!("{}", Theme::divider(WIDTH));
    }

    let verb = if result.dry_run { "Would delete" } else { "Deleted" };
    println!(
        "{} {} entries, {}",
        verb,
        Theme::value(&result.files_deleted.to_string()),
        Theme::size(&size_human(result.bytes_freed))
    );
    if result.deferred_on_restart > 0 {
        println!(
            "{}",
            Theme::warning(&format!(
                "{} locked entries will be removed at next restart",
                result.deferred_on_restart
            ))
        );
    }
    if result.failed_entries > 0 {
        println!(
            "{}",
            Theme::muted(&format!(
                "{} entries were skipped (locked, protected or unreadable)",
                result.failed_entries
            ))
        );
    }

    for action in &result.post_actions {
        let status = if action.succeeded {
            Theme::success("OK")
        } else {
            Theme::error("FAILED")
        };
        println!("{} {}: {}", status, action.action, action.message);
    }

    if result.cancelled {
        println!(
            "{}",
            Theme::warning("Run interrupted; totals cover the work finished before cancellation.")
        );
    }
    println!();
}

#[derive(Serialize)]
struct JsonCategory {
    category: Category,
    items: usize,
    size_bytes: u64,
    size_human: String,
}

#[derive(Serialize)]
struct JsonPreview<'a> {
    version: &'static str,
    timestamp: String,
    total_items: usize,
    total_bytes: u64,
    total_human: String,
    categories: Vec<JsonCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a CleanupReport>,
}

#[derive(Serialize)]
struct JsonResult<'a> {
    version: &'static str,
    timestamp: String,
    bytes_freed_human: String,
    #[serde(flatten)]
    result: &'a CleanupResult,
}

/// Preview as JSON. `include_items` adds every scanned item.
pub fn preview_json(report: &CleanupReport, include_items: bool) -> anyhow::Result<String> {
    let categories = report
        .by_category()
        .into_iter()
        .map(|(category, totals)| JsonCategory {
            category,
            items: totals.items,
            size_bytes: totals.bytes,
            size_human: size_human(totals.bytes),
        })
        .collect();
    let preview = JsonPreview {
        version: "1.0",
        timestamp: report.generated_at.to_rfc3339(),
        total_items: report.total_items(),
        total_bytes: report.total_bytes(),
        total_human: size_human(report.total_bytes()),
        categories,
        report: include_items.then_some(report),
    };
    Ok(serde_json::to_string_pretty(&preview)?)
}

pub fn result_json(result: &CleanupResult) -> anyhow::Result<String> {
    let json = JsonResult {
        version: "1.0",
        timestamp: chrono::Local::now().to_rfc3339(),
        bytes_freed_human: size_human(result.bytes_freed),
        result,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::DirectoryTotals;
    use crate::report::{ReportItem, ReportSection};
    use crate::result::Aggregator;
    use std::path::PathBuf;

    fn sample_report() -> CleanupReport {
        CleanupReport {
            generated_at: chrono::Local::now(),
            sections: vec![ReportSection {
                category: Category::UserTemp,
                root: PathBuf::from("temp"),
                items: vec![
                    ReportItem {
                        path: PathBuf::from("temp/a.tmp"),
                        size_bytes: 1024,
                        is_directory: false,
                    },
                    ReportItem {
                        path: PathBuf::from("temp/sub"),
                        size_bytes: 0,
                        is_directory: true,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_truncate_path_keeps_tail() {
        assert_eq!(truncate_path("short", 10), "short");
        assert_eq!(truncate_path("abcdefghij", 8), "...fghij");
    }

    #[test]
    fn test_preview_json_totals() {
        let json = preview_json(&sample_report(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_items"], 2);
        assert_eq!(value["total_bytes"], 1024);
        assert_eq!(value["categories"][0]["category"], "user_temp");
        assert!(value.get("report").is_none());

        let with_items = preview_json(&sample_report(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&with_items).unwrap();
        assert_eq!(value["report"]["sections"][0]["items"][1]["is_directory"], true);
    }

    #[test]
    fn test_result_json_is_flat() {
        let aggregator = Aggregator::new(true);
        aggregator.add(
            Category::Prefetch,
            DirectoryTotals {
                files_deleted: 2,
                bytes_freed: 2048,
                ..Default::default()
            },
        );
        let json = result_json(&aggregator.snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files_deleted"], 2);
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["categories"]["prefetch"]["bytes_freed"], 2048);
        assert!(value["bytes_freed_human"].as_str().is_some());
    }
}
