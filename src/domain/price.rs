//! Locale-aware price normalization
//!
//! Listing pages render prices as `89,90 TL`, `1.299,00 ₺`, `$1,299.00` and so on.
//! [`normalize_price`] turns any of those into a value rounded to cents, picking the
//! decimal separator by position.

/// Round to two decimal places, half away from zero
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Canonical text form of a price, the same form the product table stores
pub fn format_price(value: f64) -> String {
    format!("{value:.2}")
}

/// Parse a locale-formatted price into a value rounded to cents.
///
/// The number is the run next to a currency marker (`TL`, `₺`, `TRY`) when the text
/// has one, otherwise the first numeric run. Runs are digits with `.`/`,`; a
/// non-breaking space joins two parts only when exactly three digits follow it, so
/// `1\u{a0}299,00` reads as `1299,00` while `Kupa 6 349,90 TL` stays `349,90`.
///
/// Separator rules within the run:
/// - both `,` and `.` present: the one occurring last is the decimal separator
/// - one kind occurring more than once: thousands grouping (`1.234.567`)
/// - one kind occurring once with exactly three digits after it: thousands grouping (`1.299`)
/// - otherwise the single separator is the decimal separator (`89,90`, `12.5`)
///
/// Returns `None` when no digits are found. Normalizing a canonical string such as
/// `"1299.00"` returns the same value.
pub fn normalize_price(text: &str) -> Option<f64> {
    let runs = numeric_runs(text);
    let run = priced_run(text, &runs).or_else(|| runs.first())?;
    let run = run.digits.trim_end_matches(['.', ',']);

    let last_comma = run.rfind(',');
    let last_dot = run.rfind('.');

    let canonical: String = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            let (decimal, grouping) = if comma > dot { (',', '.') } else { ('.', ',') };
            run.chars()
                .filter(|c| *c != grouping)
                .map(|c| if c == decimal { '.' } else { c })
                .collect()
        }
        (Some(_), None) => single_separator(run, ','),
        (None, Some(_)) => single_separator(run, '.'),
        (None, None) => run.to_string(),
    };

    canonical
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(round_to_cents)
}

/// Spaces used as thousands grouping by storefronts: NBSP and narrow NBSP
pub fn is_grouping_space(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{202F}')
}

const CURRENCY_MARKERS: [&str; 3] = ["TL", "₺", "TRY"];

/// Digits and separators with byte bounds in the source text
#[derive(Debug)]
struct NumericRun {
    start: usize,
    end: usize,
    digits: String,
}

fn numeric_runs(text: &str) -> Vec<NumericRun> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut runs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].1.is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = chars[i].0;
        let mut digits = String::new();
        let mut end = i;
        while let Some(&(_, c)) = chars.get(end) {
            if c.is_ascii_digit() || matches!(c, '.' | ',') {
                digits.push(c);
            } else if !(is_grouping_space(c) && three_digits_follow(&chars[end + 1..])) {
                break;
            }
            end += 1;
        }

        runs.push(NumericRun {
            start,
            end: chars.get(end).map_or(text.len(), |(byte, _)| *byte),
            digits,
        });
        i = end;
    }

    runs
}

fn three_digits_follow(rest: &[(usize, char)]) -> bool {
    rest.len() >= 3
        && rest[..3].iter().all(|(_, c)| c.is_ascii_digit())
        && rest.get(3).is_none_or(|(_, c)| !c.is_ascii_digit())
}

/// The run directly before (or after) the first currency marker that has one
fn priced_run<'a>(text: &str, runs: &'a [NumericRun]) -> Option<&'a NumericRun> {
    let mut markers: Vec<(usize, usize)> = CURRENCY_MARKERS
        .iter()
        .flat_map(|marker| text.match_indices(marker).map(|(at, m)| (at, at + m.len())))
        .collect();
    markers.sort_unstable();

    markers.into_iter().find_map(|(at, marker_end)| {
        runs.iter()
            .rev()
            .find(|run| run.end <= at && text[run.end..at].trim().is_empty())
            .or_else(|| {
                runs.iter()
                    .find(|run| run.start >= marker_end && text[marker_end..run.start].trim().is_empty())
            })
    })
}

fn single_separator(run: &str, separator: char) -> String {
    let occurrences = run.matches(separator).count();
    let digits_after = run
        .rsplit(separator)
        .next()
        .map_or(0, str::len);

    if occurrences > 1 || digits_after == 3 {
        run.replace(separator, "")
    } else {
        run.replace(separator, ".")
    }
}
