use anyhow::{Context, Result};
use std::path::Path;

/// One line of an input list: a source id and an optional second column
/// (target YTID or subtitle filename, depending on the mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    pub source_id: String,
    pub target: Option<String>,
}

impl InputRow {
    /// Target column, or the source id when the row has only one column.
    pub fn target_or_source(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.source_id)
    }
}

pub fn parse_rows(text: &str) -> Vec<InputRow> {
    text.lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let first = cols.next()?;
            if first.starts_with('#') { return None; }
            Some(InputRow { source_id: first.to_string(), target: cols.next().map(str::to_string) })
        })
        .collect()
}

pub async fn read_rows(path: &Path) -> Result<Vec<InputRow>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read input file: {}", path.display()))?;
    Ok(parse_rows(&text))
}

/// Reads a one-id-per-line list into a set. Extra columns are ignored with a warning.
pub fn parse_id_list(text: &str, origin: &str) -> std::collections::HashSet<String> {
    let mut out = std::collections::HashSet::new();
    for line in text.lines() {
        let mut cols = line.split_whitespace();
        let Some(first) = cols.next() else { continue };
        if cols.next().is_some() {
            tracing::warn!(file = origin, line, "unexpected extra columns");
        }
        out.insert(first.to_string());
    }
    out
}
