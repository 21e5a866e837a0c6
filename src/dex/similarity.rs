//! Name scoring used to reconcile OCR output with catalog names.

const CLOSENESS_WEIGHT: f32 = 0.85;
const FIRST_LETTER_WEIGHT: f32 = 0.10;
const LENGTH_WEIGHT: f32 = 0.05;

/// Penalty applied to the token-sorted comparison so that an in-order match
/// always beats a reordered one.
const TOKEN_SORT_SCALE: f64 = 0.95;

/// Penalty on the best substring alignment, so a name found inside a longer
/// reading never outranks an exact reading.
const PARTIAL_SCALE: f64 = 0.9;

/// Substring alignment is only tried once the longer string is at least this
/// many times the shorter one.
const PARTIAL_LENGTH_RATIO: f64 = 1.5;

/// Case-insensitive, word-order tolerant similarity in `[0, 1]`.
///
/// When one string is much longer than the other, the shorter one is also
/// aligned against every same-length window of the longer one. Trailing OCR
/// junk such as a level tag ("Nucleon Lv5") then still scores high.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }

    let direct = strsim::normalized_levenshtein(&a, &b);
    let sorted = strsim::normalized_levenshtein(&sort_tokens(&a), &sort_tokens(&b));
    let partial = partial_similarity(&a, &b);

    direct
        .max(sorted * TOKEN_SORT_SCALE)
        .max(partial * PARTIAL_SCALE)
        .clamp(0.0, 1.0) as f32
}

/// Best normalized Levenshtein score of the shorter string against any
/// window of the longer one. Zero when the lengths are too close.
fn partial_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() || (long.len() as f64) < short.len() as f64 * PARTIAL_LENGTH_RATIO {
        return 0.0;
    }

    let short: String = short.into_iter().collect();
    long.windows(short.chars().count())
        .map(|window| {
            let window: String = window.iter().collect();
            strsim::normalized_levenshtein(&short, &window)
        })
        .fold(0.0, f64::max)
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Confidence that catalog name `actual` is what the screen meant by `desired`.
///
/// `0.85 * similarity + 0.10 * same first character + 0.05 * same length`.
/// The first-character check is case-sensitive.
pub fn name_confidence(desired: &str, actual: &str) -> f32 {
    let closeness = similarity(actual, desired);

    let first_letter = match (desired.chars().next(), actual.chars().next()) {
        (Some(d), Some(a)) if d == a => 1.0,
        _ => 0.0,
    };

    let length = if desired.chars().count() == actual.chars().count() {
        1.0
    } else {
        0.0
    };

    CLOSENESS_WEIGHT * closeness + FIRST_LETTER_WEIGHT * first_letter + LENGTH_WEIGHT * length
}
