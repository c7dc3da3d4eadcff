//! EMA feed export for Khan Academy courses and Khanova škola schemas.

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::path::Path;

use crate::ema::{EmaId, EmaItem, KA_TABLES, KS_TABLES};
use crate::khan::{content_items, find_topic, ContentKind, TopicNode};
use crate::mapping::{ema_item_from_source, source_from_topic_node, ItemContext, SourceItem};

pub static MATH_COURSES: [&str; 6] = ["early-math", "arithmetic", "basic-geo", "trigonometry", "algebra-basics", "pre-algebra"];

/// Every exportable course in prerequisite order; an item appearing in an earlier one is not exported again.
pub static KA_COURSES: [&str; 8] = [
    "early-math", "arithmetic", "basic-geo", "trigonometry", "algebra-basics", "pre-algebra",
    "music", "cosmology-and-astronomy",
];

pub fn ka_course_subject(course: &str) -> Option<&'static str> {
    match course {
        c if MATH_COURSES.contains(&c) => Some("math"),
        "music" => Some("music"),
        "cosmology-and-astronomy" => Some("astro"),
        _ => None,
    }
}

/// Courses whose items are excluded from `course`.
pub fn prerequisites(course: &str) -> &'static [&'static str] {
    match KA_COURSES.iter().position(|c| *c == course) {
        Some(i) => &KA_COURSES[..i],
        None => &[],
    }
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub items: Vec<EmaItem>,
    pub not_listed: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

pub fn export_ka_course(tree: &TopicNode, course: &str, kind: ContentKind, listed: &HashSet<String>) -> Result<ExportReport> {
    let subject = ka_course_subject(course)
        .ok_or_else(|| anyhow!("invalid course `{course}`, valid courses are: {}", KA_COURSES.join(", ")))?;
    let subtree = find_topic(tree, course).ok_or_else(|| anyhow!("could not find subtree for course: {course}"))?;

    let mut seen: HashSet<String> = HashSet::new();
    for prev in prerequisites(course) {
        match find_topic(tree, prev) {
            Some(t) => seen.extend(content_items(t, kind).into_iter().map(|n| n.id.clone())),
            None => tracing::warn!(course = *prev, "prerequisite course not found in topic tree"),
        }
    }
    if subject == "math" {
        tracing::info!("Number of unique ids from preceding math courses = {}", seen.len());
    }

    let ctx = ItemContext { course, subject, content_type: kind.as_str() };
    let mut report = ExportReport::default();
    for node in content_items(subtree, kind) {
        if !listed.contains(&node.id) && !listed.contains(&node.slug) {
            tracing::debug!(slug = %node.slug, "not listed");
            report.not_listed += 1;
            continue;
        }
        if !seen.insert(node.id.clone()) {
            tracing::debug!(slug = %node.slug, "found in a preceding course, skipping");
            report.duplicates += 1;
            continue;
        }
        match ema_item_from_source(&KA_TABLES, &ctx, source_from_topic_node(node)) {
            Ok(item) => report.items.push(item),
            Err(e) => {
                tracing::warn!(slug = %node.slug, "{e}");
                report.rejected += 1;
            }
        }
    }
    Ok(report)
}

pub fn ka_output_name(course: &str, kind: ContentKind) -> String {
    format!("ka_{}_{}.json", course.replace('-', "_").to_lowercase(), kind.as_str())
}

/// Schemas that can be exported, with their database id.
pub const KS_SCHEMAS: [(&str, i32); 3] = [("organicka-chemie", 24), ("fyzikalni-chemie", 20), ("obecna-chemie", 2)];

pub fn ks_schema_id(schema: &str) -> Option<i32> {
    KS_SCHEMAS.iter().find(|(s, _)| *s == schema).map(|(_, id)| *id)
}

pub fn ks_schema_subject(schema: &str) -> Option<&'static str> {
    match schema {
        "organicka-chemie" | "fyzikalni-chemie" | "obecna-chemie" | "rychlokurz-chemie" => Some("chem"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KsVideo {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
}

pub fn ks_video_url(schema_id: i64, block_id: i64, content_id: i64) -> String {
    format!("https://khanovaskola.cz/video/{schema_id}/{block_id}/{content_id}")
}

/// Every Khanova škola video is published under the default license.
pub fn export_ks_schema(schema: &str, videos: &[KsVideo]) -> Result<ExportReport> {
    let subject = ks_schema_subject(schema).ok_or_else(|| anyhow!("no subject known for schema `{schema}`"))?;
    let ctx = ItemContext { course: schema, subject, content_type: ContentKind::Video.as_str() };
    let mut seen = HashSet::new();
    let mut report = ExportReport::default();
    for v in videos {
        if !seen.insert(v.id) {
            tracing::debug!(id = v.id, "found in previous schemas, skipping");
            report.duplicates += 1;
            continue;
        }
        let src = SourceItem {
            id: Some(EmaId::Number(v.id)),
            url: Some(v.url.clone()),
            title: v.title.clone(),
            description: v.description.clone(),
            creation_date: None,
            license: None,
        };
        match ema_item_from_source(&KS_TABLES, &ctx, src) {
            Ok(item) => report.items.push(item),
            Err(e) => {
                tracing::warn!(id = v.id, "{e}");
                report.rejected += 1;
            }
        }
    }
    Ok(report)
}

pub fn ks_output_name(schema: &str) -> String {
    format!("ks_{}_video.json", schema.replace('-', "_").to_lowercase())
}

/// Writes items as one JSON array, non-ASCII characters kept as UTF-8.
pub async fn write_feed(path: &Path, items: &[EmaItem]) -> Result<()> {
    let json = serde_json::to_string(items)?;
    tokio::fs::write(path, json).await.with_context(|| format!("failed to write {}", path.display()))
}
