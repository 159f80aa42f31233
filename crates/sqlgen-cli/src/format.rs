use sqlgen_core::cache::CacheStats;
use sqlgen_core::db::Row;

/// Render query results for the console: header row, dashed separator,
/// one ` | `-joined line per row.
pub fn format_rows(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "No results found.".to_string();
    }

    let headers: Vec<&str> = rows[0].keys().map(|k| k.as_str()).collect();
    let mut formatted = headers.join(" | ");
    formatted.push('\n');
    formatted.push_str(&"-".repeat(formatted.len()));
    formatted.push('\n');

    for row in rows {
        let line = headers
            .iter()
            .map(|h| render_value(row.get(*h)))
            .collect::<Vec<_>>()
            .join(" | ");
        formatted.push_str(&line);
        formatted.push('\n');
    }
    formatted
}

/// Render live session state for the repl's `:stats` command.
pub fn format_session_stats(stats: &CacheStats, examples: usize) -> String {
    format!(
        "cache size: {}/{}\ncache enabled: {}\nexamples: {}",
        stats.size, stats.max_size, stats.enabled, examples
    )
}

fn render_value(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => "NULL".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
