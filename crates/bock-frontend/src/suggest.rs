//! "Did you mean" suggestions for misspelled keys and flags.

/// Find the candidate closest to `value`, if any is close enough to be a typo.
///
/// Distances are Levenshtein edits; values longer than ten characters may be
/// off by three edits, shorter ones by two. An exact match is not a
/// suggestion.
#[must_use]
pub fn closest<'a>(value: &str, candidates: &[&'a str], case_sensitive: bool) -> Option<&'a str> {
    if value.is_empty() {
        return None;
    }

    let normalize = |s: &str| {
        if case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };
    let value = normalize(value);
    let max_distance = if value.chars().count() > 10 { 3 } else { 2 };

    candidates
        .iter()
        .filter_map(|candidate| {
            let distance = strsim::levenshtein(&value, &normalize(candidate));
            (distance > 0 && distance <= max_distance).then_some((distance, *candidate))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}
