use pictionary_types::{GUESS_HISTORY_LIMIT, Recognition};

/// Accepted alternatives keyed by normalized target word.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("CAR", &["AUTOMOBILE", "VEHICLE"]),
    ("HOUSE", &["HOME", "BUILDING"]),
    ("SMILE", &["HAPPY", "SMILEY"]),
    ("PHONE", &["MOBILE", "CELL", "CELLPHONE", "SMARTPHONE"]),
];

/// Uppercase and trim, the only normalization guesses get
pub fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

pub fn synonyms(target: &str) -> &'static [&'static str] {
    let target = normalize(target);
    SYNONYMS
        .iter()
        .find(|(word, _)| *word == target)
        .map(|(_, alternatives)| *alternatives)
        .unwrap_or(&[])
}

/// Check if a free-text guess counts as the target word.
///
/// Exact match, a trailing "S" on either side, or one of the target's
/// listed synonyms. No stemming or fuzzy matching.
pub fn matches(guess: &str, target: &str) -> bool {
    let guess = normalize(guess);
    let target = normalize(target);

    if guess == target {
        return true;
    }

    if guess == format!("{}S", target) || format!("{}S", guess) == target {
        return true;
    }

    synonyms(&target).iter().any(|alternative| *alternative == guess)
}

/// Run ranked candidates through [`matches`] and report the first hit.
/// Only the first `GUESS_HISTORY_LIMIT` candidates are considered.
pub fn evaluate(guesses: Vec<String>, target: &str) -> Recognition {
    let guesses: Vec<String> = guesses.into_iter().take(GUESS_HISTORY_LIMIT).collect();
    let matched_guess = guesses.iter().find(|guess| matches(guess, target)).cloned();

    Recognition {
        is_correct: matched_guess.is_some(),
        matched_guess,
        guesses,
    }
}
