//! Digest: one summary message for the top report rows

use html_escape::encode_text;

use crate::domain::price::format_price;
use crate::domain::report::{ReportRow, format_rate};
use crate::infrastructure::config::PublisherConfig;

/// Render the digest text for the first `digest_limit` rows
pub fn build_digest(rows: &[ReportRow], config: &PublisherConfig) -> String {
    let labels = &config.labels;
    let mut lines = vec![format!("<b>{}</b>", encode_text(&config.digest_title)), String::new()];

    for row in rows.iter().take(config.digest_limit) {
        let price = row
            .price
            .map_or_else(|| "-".to_string(), |p| format!("{}{}", format_price(p), labels.currency));
        lines.push(format!(
            "• <b>{}</b> | {}: {} | {}: %{} | {}: <b>{}{}</b>",
            encode_text(row.name.trim()),
            encode_text(&labels.price),
            encode_text(&price),
            encode_text(&labels.commission),
            format_rate(row.commission_rate),
            encode_text(&labels.earnings),
            format_price(row.estimated_commission),
            encode_text(&labels.currency),
        ));
    }

    if !config.digest_footer.trim().is_empty() {
        lines.push(String::new());
        lines.push(encode_text(config.digest_footer.trim()).into_owned());
    }

    lines.join("\n")
}

/// Split `text` into pieces of at most `max_chars` characters, breaking on line
/// boundaries. A single line longer than the limit is split at character
/// boundaries.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { current_len + 1 + line_len };

        if needed <= max_chars {
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= max_chars {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            let mut pieces = chars.chunks(max_chars).map(|c| c.iter().collect::<String>()).peekable();
            while let Some(piece) = pieces.next() {
                if pieces.peek().is_some() {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}
