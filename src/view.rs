//! HTML pages
//!
//! Small server-rendered pages: the submission form, link details, the
//! shared error page and the analytics listing. All interpolated values go
//! through [`escape`].

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::model::LinkRecord;

const KIB: f64 = 1024.0;
const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// Formats a byte count as KB, MB or GB with two decimals (1024-based)
pub fn format_size(bytes: u64) -> String {
    let value = bytes as f64;
    if bytes < MIB {
        format!("{:.2} KB", value / KIB)
    } else if bytes < GIB {
        format!("{:.2} MB", value / KIB / KIB)
    } else {
        format!("{:.2} GB", value / KIB / KIB / KIB)
    }
}

/// Whole days left before expiry, counting the current partial day
pub fn days_to_expire(expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry_date - now).num_days() + 1
}

/// Keeps the first `max` characters, appending "..." when something was cut
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Escapes text for HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

/// Landing page with the URL submission form
pub fn index_page() -> String {
    layout(
        "Direct link relay",
        r#"<main>
<h1>Direct link relay</h1>
<form method="post" action="/verifyurl">
<input type="url" name="url" placeholder="https://example.com/file.zip" required>
<button type="submit">Create link</button>
</form>
</main>"#,
    )
}

/// Detail page of a live link
pub fn detail_page(record: &LinkRecord, now: DateTime<Utc>) -> String {
    let body = format!(
        r#"<main>
<h1>{filename}</h1>
<dl>
<dt>Size</dt><dd>{size}</dd>
<dt>Extension</dt><dd>{extension}</dd>
<dt>Expires</dt><dd>in {days} days</dd>
</dl>
<a href="/download/{id}">Download</a>
</main>"#,
        filename = escape(&record.filename),
        size = format_size(record.filesize),
        extension = escape(&record.extension),
        days = days_to_expire(record.expiry_date, now),
        id = escape(&record.id),
    );
    layout(&record.filename, &body)
}

/// Shared error page
pub fn error_page(message: &str) -> String {
    let body = format!(
        r#"<main>
<h1>Error</h1>
<p class="error">{}</p>
<a href="/">Back</a>
</main>"#,
        escape(message)
    );
    layout("Error", &body)
}

/// Summed size of `records`, saturating instead of overflowing
pub fn total_size(records: &[LinkRecord]) -> u64 {
    records
        .iter()
        .map(|record| record.filesize)
        .fold(0u64, u64::saturating_add)
}

/// Listing of every stored record with the summed size
///
/// `records` are expected already deduplicated and ordered.
pub fn analytics_page(records: &[LinkRecord]) -> String {
    let total = total_size(records);

    let mut rows = String::new();
    for record in records {
        let _ = write!(
            rows,
            r#"<tr><td>{id}</td><td><a href="{url}" target="_blank">{display_url}</a></td><td>{filename}</td><td>{size}</td><td>{extension}</td><td>{expiry}</td></tr>
"#,
            id = escape(&record.id),
            url = escape(&record.url),
            display_url = escape(&truncate(&record.url, 50)),
            filename = escape(&truncate(&record.filename, 20)),
            size = format_size(record.filesize),
            extension = escape(&record.extension),
            expiry = record.expiry_date.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    let body = format!(
        r#"<main>
<section><h2>Total Size</h2><p class="total">{total}</p></section>
<table>
<thead><tr><th>ID</th><th>URL</th><th>Filename</th><th>Filesize</th><th>Extension</th><th>Expiry Date</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
</main>"#,
        total = format_size(total),
    );
    layout("Data", &body)
}
