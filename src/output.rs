use std::collections::HashMap;

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::model::InventorySnapshot;
use crate::report::OperationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

pub fn print_report(report: &OperationReport, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(report)?),
        Format::Pretty => {
            let failed = report.failures.len();
            let status = if failed == 0 {
                "ok".green().bold()
            } else {
                "partial".yellow().bold()
            };
            println!(
                "{} {}: {}/{} spaces succeeded",
                report.operation.to_string().bold(),
                status,
                report.succeeded,
                report.total
            );
            for created in &report.created {
                let parent = created.parent.as_deref().unwrap_or("-");
                println!(
                    "  {} {} {} -> {} (parent: {})",
                    "+".green(),
                    created.title,
                    created.old_id,
                    created.new_id,
                    parent
                );
            }
            for failure in &report.failures {
                println!(
                    "  {} {} [{}] {}: {}",
                    "x".red(),
                    failure.title,
                    failure.space_id,
                    failure.stage,
                    failure.message
                );
            }
        }
        Format::Minimal => {
            println!(
                "{} total={} succeeded={} failed={}",
                report.operation,
                report.total,
                report.succeeded,
                report.failures.len()
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TreeNode {
    id: String,
    title: String,
    /// Set on top-level nodes whose parent is missing or part of a cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    children: Vec<TreeNode>,
}

/// Every space exactly once: true roots first, then one entry per cycle,
/// rooted at its first member in snapshot order.
fn inventory_forest(snapshot: &InventorySnapshot) -> Vec<TreeNode> {
    let children = snapshot.children_by_parent();
    let mut seen = vec![false; snapshot.len()];
    let mut forest = Vec::new();

    for root in snapshot.roots() {
        forest.push(build_tree(root, snapshot, &children, &mut seen, true));
    }
    for idx in 0..snapshot.len() {
        if !seen[idx] {
            forest.push(build_tree(idx, snapshot, &children, &mut seen, true));
        }
    }
    forest
}

fn build_tree(
    idx: usize,
    snapshot: &InventorySnapshot,
    children: &HashMap<&str, Vec<usize>>,
    seen: &mut [bool],
    top_level: bool,
) -> TreeNode {
    seen[idx] = true;
    let space = &snapshot.spaces()[idx];
    let mut child_nodes = Vec::new();
    for &child in children.get(space.id.as_str()).into_iter().flatten() {
        if !seen[child] {
            child_nodes.push(build_tree(child, snapshot, children, seen, false));
        }
    }

    TreeNode {
        id: space.id.clone(),
        title: space.title.clone(),
        parent: space.parent.clone().filter(|_| top_level),
        children: child_nodes,
    }
}

/// Box-drawing lines for one tree. `trail` holds, per ancestor below the
/// top level, whether that ancestor was the last of its siblings.
fn render_tree(node: &TreeNode, trail: &mut Vec<bool>, lines: &mut Vec<String>) {
    let mut line = String::new();
    if let Some((&last, ancestors)) = trail.split_last() {
        for &done in ancestors {
            line.push_str(if done { "    " } else { "\u{2502}   " });
        }
        line.push_str(if last {
            "\u{2514}\u{2500}\u{2500} "
        } else {
            "\u{251c}\u{2500}\u{2500} "
        });
    }
    line.push_str(&format!("{} [{}]", node.title, node.id.dimmed()));
    if let Some(parent) = &node.parent {
        line.push_str(&format!(" (parent {})", parent.yellow()));
    }
    lines.push(line);

    for (i, child) in node.children.iter().enumerate() {
        trail.push(i + 1 == node.children.len());
        render_tree(child, trail, lines);
        trail.pop();
    }
}

/// Shortens `title` to at most `width` characters, ending in an ellipsis.
pub fn truncate_title(title: &str, width: usize) -> String {
    if title.chars().nth(width).is_none() {
        return title.to_string();
    }
    let mut short: String = title.chars().take(width.saturating_sub(1)).collect();
    short.push('\u{2026}');
    short
}

pub fn print_inventory(snapshot: &InventorySnapshot, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(snapshot)?),
        Format::Pretty => {
            let mut lines = Vec::new();
            for tree in inventory_forest(snapshot) {
                render_tree(&tree, &mut Vec::new(), &mut lines);
            }
            for line in lines {
                println!("{line}");
            }
        }
        Format::Minimal => {
            println!("{:24} {:24} PARENT", "ID", "TITLE");
            println!("{}", "-".repeat(60));
            for space in snapshot {
                println!(
                    "{:24} {:24} {}",
                    space.id,
                    truncate_title(&space.title, 24),
                    space.parent.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
