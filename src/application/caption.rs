//! Caption rendering for Telegram `HTML` parse mode

use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::debug;

use crate::domain::price::format_price;
use crate::domain::report::{ReportRow, format_rate};
use crate::infrastructure::config::CaptionLabels;

/// Caption for one report row, at most `max_chars` characters.
///
/// Only the product name is shortened to fit, so the markup stays balanced. When
/// `link` alone pushes the rest past the limit the row's plain URL is used
/// instead; `None` if even that does not fit.
pub fn format_caption(row: &ReportRow, labels: &CaptionLabels, link: &str, max_chars: usize) -> Option<String> {
    let price = row
        .price
        .map_or_else(|| "-".to_string(), |p| format!("{} {}", format_price(p), labels.currency));

    let render = |link: &str| {
        format!(
            "💰 {}: {}\n📈 {}: %{}\n💵 {}: {} {}\n🔗 <a href=\"{}\">{}</a>",
            encode_text(&labels.price),
            encode_text(&price),
            encode_text(&labels.commission),
            format_rate(row.commission_rate),
            encode_text(&labels.earnings),
            format_price(row.estimated_commission),
            encode_text(&labels.currency),
            encode_double_quoted_attribute(link),
            encode_text(&labels.link),
        )
    };
    let fixed = |body: &str| "<b></b>\n".chars().count() + body.chars().count();

    let mut body = render(link);
    if fixed(&body) > max_chars && link != row.url {
        debug!("Caption for {} too long with tagged link, using plain URL", row.sku);
        body = render(&row.url);
    }
    let fixed = fixed(&body);
    if fixed > max_chars {
        return None;
    }

    let name = truncate_escaped(row.name.trim(), max_chars - fixed);
    Some(format!("<b>{name}</b>\n{body}"))
}

/// Escaped `text`, cut so the escaped form has at most `budget` characters;
/// an ellipsis marks the cut
fn truncate_escaped(text: &str, budget: usize) -> String {
    let escaped = encode_text(text);
    if escaped.chars().count() <= budget {
        return escaped.into_owned();
    }

    let budget = budget.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let piece = encode_text(&*c.encode_utf8(&mut [0; 4])).into_owned();
        let len = piece.chars().count();
        if used + len > budget {
            break;
        }
        out.push_str(&piece);
        used += len;
    }
    out.push('…');
    out
}
