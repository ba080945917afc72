//! Fuzzy matching for "did you mean" hints
//!
//! Unknown hash algorithms, templates and functions are compared against the
//! names that do exist using Levenshtein distance, so error messages can point
//! at the most likely intended name.

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Suggestion result with confidence scoring
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggested correction
    pub text: String,
    /// Levenshtein distance (lower = better match)
    pub distance: usize,
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Find closest matches from a list of candidates
pub fn find_closest_matches<'a, I>(
    input: &str,
    candidates: I,
    max_results: usize,
) -> Vec<Suggestion>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut suggestions: Vec<Suggestion> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = levenshtein(input, candidate);
            if distance <= MAX_SUGGESTION_DISTANCE && distance > 0 {
                Some(Suggestion {
                    text: candidate.to_string(),
                    distance,
                })
            } else {
                None
            }
        })
        .collect();

    // Sort by distance, then by name so equal distances stay reproducible
    suggestions.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.text.cmp(&b.text)));
    suggestions.truncate(max_results);
    suggestions
}

/// Build a "Did you mean ...?" hint, or `None` when nothing is close enough
pub fn did_you_mean<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let matches = find_closest_matches(input, candidates, 3);
    if matches.is_empty() {
        return None;
    }

    let names: Vec<String> = matches.iter().map(|s| format!("`{}`", s.text)).collect();
    Some(format!("Did you mean {}?", names.join(" or ")))
}

/// Extract the offending name from an engine message such as
/// `unknown function: hsah is unknown`
pub fn extract_unknown_name(msg: &str) -> Option<String> {
    // Quoted names first: "no template `foo`" or "template 'foo'"
    for (start, end) in [("`", "`"), ("'", "'"), ("\"", "\"")] {
        if let Some(start_idx) = msg.find(start) {
            let rest = &msg[start_idx + start.len()..];
            if let Some(end_idx) = rest.find(end) {
                return Some(rest[..end_idx].to_string());
            }
        }
    }

    let (_, rest) = msg.split_once(": ")?;
    rest.split_whitespace()
        .next()
        .map(|name| name.trim_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '-'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
