//! Directory listing page

use crate::handler::path::encode_segment;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Read `dir`, directories first, then by name
///
/// Entries whose names are not UTF-8 or whose metadata cannot be read are
/// skipped.
pub async fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(item) = reader.next_entry().await? {
        let Ok(name) = item.file_name().into_string() else {
            continue;
        };
        // Follows symlinks so linked directories list as directories
        let Ok(metadata) = fs::metadata(item.path()).await else {
            continue;
        };
        entries.push(Entry {
            name,
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Render the listing page for request path `path` (ends with `/`)
pub fn render(path: &str, entries: &[Entry]) -> String {
    let title = escape_html(path);
    let mut rows = String::new();

    if path != "/" {
        rows.push_str("<tr><td><a href=\"../\">../</a></td><td></td><td></td></tr>\n");
    }

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let size = if entry.is_dir {
            "-".to_string()
        } else {
            format_size(entry.size)
        };
        let modified = entry
            .modified
            .map(crate::http::cache::format_http_date)
            .unwrap_or_default();
        rows.push_str(&format!(
            "<tr><td><a href=\"{href}{suffix}\">{name}{suffix}</a></td><td>{size}</td><td>{modified}</td></tr>\n",
            href = encode_segment(&entry.name),
            name = escape_html(&entry.name),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Index of {title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
            margin: 40px;
            color: #222;
        }}
        table {{
            border-collapse: collapse;
            min-width: 600px;
        }}
        th, td {{
            text-align: left;
            padding: 4px 16px 4px 0;
        }}
        th {{
            border-bottom: 1px solid #ccc;
        }}
        a {{
            color: #2563eb;
            text-decoration: none;
        }}
        a:hover {{
            text-decoration: underline;
        }}
    </style>
</head>
<body>
    <h1>Index of {title}</h1>
    <table>
        <tr><th>Name</th><th>Size</th><th>Modified</th></tr>
{rows}    </table>
</body>
</html>"#
    )
}

/// Human-readable size, binary units
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
