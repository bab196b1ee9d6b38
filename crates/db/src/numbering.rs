//! Sequential identifiers handed out on first save.

use estimo_core::domain::quote::{QuoteId, QuoteNumber};

pub const DEFAULT_NUMBER_PREFIX: &str = "ORC";

/// `O{n}` where `n` is one past the highest existing `O<digits>` id.
/// Ids in any other shape are ignored.
pub fn next_quote_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> QuoteId {
    let runs = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix('O'))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
    QuoteId(format!("O{}", successor_of_largest(runs)))
}

/// `{prefix}{n}` where `n` is one past the largest number formed by the digits
/// of any existing quote number, or `1` when there is none.
pub fn next_quote_number<'a>(
    prefix: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> QuoteNumber {
    let runs: Vec<String> = existing
        .into_iter()
        .map(|number| number.chars().filter(char::is_ascii_digit).collect::<String>())
        .filter(|digits| !digits.is_empty())
        .collect();
    QuoteNumber(format!("{prefix}{}", successor_of_largest(runs.iter().map(String::as_str))))
}

/// Digit runs are compared as decimal strings, so any length is ordered
/// correctly and the successor never wraps.
fn successor_of_largest<'a>(runs: impl Iterator<Item = &'a str>) -> String {
    let largest = runs
        .map(|digits| digits.trim_start_matches('0'))
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .unwrap_or_default();
    increment(largest)
}

fn increment(digits: &str) -> String {
    let mut out: Vec<char> = digits.chars().collect();
    for digit in out.iter_mut().rev() {
        if *digit == '9' {
            *digit = '0';
        } else {
            *digit = char::from(*digit as u8 + 1);
            return out.into_iter().collect();
        }
    }
    std::iter::once('1').chain(out).collect()
}
