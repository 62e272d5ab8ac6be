//! Password policy engine.
//!
//! `validate` collects every violation instead of stopping at the first one, so
//! signup forms can show the full list at once. `strength_score` is a UX hint
//! only; acceptance is decided exclusively by `validate` returning no
//! violations.

use serde::Serialize;
use utoipa::ToSchema;

pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 128;

const SPECIAL_CHARS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#;

// Case-insensitive substring matches, not exact matches.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "12345678",
    "qwerty",
    "abc123",
    "password1",
    "admin",
    "letmein",
    "welcome",
    "monkey",
    "1234567890",
    "password123",
    "admin123",
    "qwerty123",
];

const KEYBOARD_ROWS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "qwertyuiop"];

const MAX_REPEAT_RUN: usize = 3;

/// A single policy violation. `validate` returns all that apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    TooShort,
    TooLong,
    MissingLowercase,
    MissingUppercase,
    MissingDigit,
    MissingSpecial,
    TooCommon,
    RepeatedCharacters,
    SequentialCharacters,
    SurroundingWhitespace,
}

impl Violation {
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::TooShort => "Password must be at least 8 characters long",
            Self::TooLong => "Password must not exceed 128 characters",
            Self::MissingLowercase => "Password must contain at least one lowercase letter",
            Self::MissingUppercase => "Password must contain at least one uppercase letter",
            Self::MissingDigit => "Password must contain at least one digit",
            Self::MissingSpecial => "Password must contain at least one special character",
            Self::TooCommon => "Password is too common",
            Self::RepeatedCharacters => "Password must not contain repeated characters",
            Self::SequentialCharacters => "Password must not contain sequential characters",
            Self::SurroundingWhitespace => "Password must not start or end with whitespace",
        }
    }
}

/// Check a candidate password against the policy, collecting every violation.
#[must_use]
pub fn validate(password: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let length = password.chars().count();

    if length < MIN_LENGTH {
        violations.push(Violation::TooShort);
    }
    if length > MAX_LENGTH {
        violations.push(Violation::TooLong);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(Violation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(Violation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(Violation::MissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        violations.push(Violation::MissingSpecial);
    }
    if is_too_common(password) {
        violations.push(Violation::TooCommon);
    }
    if has_repeat_run(password) {
        violations.push(Violation::RepeatedCharacters);
    }
    if has_sequence(password) {
        violations.push(Violation::SequentialCharacters);
    }
    if password != password.trim() {
        violations.push(Violation::SurroundingWhitespace);
    }

    violations
}

/// Strength score in `0..=100`, for UX hinting only.
///
/// Two points per character capped at 40, plus 15 per satisfied character
/// class, capped at 100. A high score does not imply the policy accepts the
/// password.
#[must_use]
pub fn strength_score(password: &str) -> u8 {
    let length = password.chars().count();
    let mut score = (length * 2).min(40);

    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 15;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 15;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 15;
    }
    if password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        score += 15;
    }

    u8::try_from(score.min(100)).unwrap_or(100)
}

fn is_too_common(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|common| lowered.contains(common))
}

fn has_repeat_run(password: &str) -> bool {
    let mut run = 1usize;
    let mut previous: Option<char> = None;
    for c in password.chars() {
        if previous == Some(c) {
            run += 1;
            if run > MAX_REPEAT_RUN {
                return true;
            }
        } else {
            run = 1;
        }
        previous = Some(c);
    }
    false
}

fn has_sequence(password: &str) -> bool {
    let lowered: Vec<char> = password.to_lowercase().chars().collect();

    // Three ascending consecutive letters or digits (abc, 789).
    for window in lowered.windows(3) {
        let ascending = |a: char, b: char, c: char| {
            (a as u32) + 1 == (b as u32) && (b as u32) + 1 == (c as u32)
        };
        let all_alpha = window.iter().all(|c| c.is_ascii_lowercase());
        let all_digit = window.iter().all(|c| c.is_ascii_digit());
        if (all_alpha || all_digit) && ascending(window[0], window[1], window[2]) {
            return true;
        }
    }

    let lowered: String = lowered.into_iter().collect();
    KEYBOARD_ROWS.iter().any(|row| lowered.contains(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_strong_password() {
        assert!(validate("Passw0rd!").is_empty());
    }

    #[test]
    fn rejects_a_common_weak_password() {
        let violations = validate("password123");
        assert!(violations.contains(&Violation::TooCommon));
        assert!(violations.contains(&Violation::MissingUppercase));
        assert!(violations.contains(&Violation::MissingSpecial));
    }

    #[test]
    fn collects_all_violations_not_just_the_first() {
        // Too short, no upper, no digit, no special.
        let violations = validate("abba");
        assert!(violations.contains(&Violation::TooShort));
        assert!(violations.contains(&Violation::MissingUppercase));
        assert!(violations.contains(&Violation::MissingDigit));
        assert!(violations.contains(&Violation::MissingSpecial));
    }

    #[test]
    fn validate_is_deterministic() {
        assert_eq!(validate("Tr0ub4dour&3"), validate("Tr0ub4dour&3"));
    }

    #[test]
    fn length_bounds() {
        assert!(validate("Aa1!Aa1!").is_empty());

        let long = format!("Aa1!{}", "x".repeat(125));
        assert!(validate(&long).contains(&Violation::TooLong));
    }

    #[test]
    fn repeated_run_of_four_rejected() {
        let violations = validate("Gooood#1x");
        assert!(violations.contains(&Violation::RepeatedCharacters));

        // Three in a row is still fine.
        assert!(!validate("Goood#1xz")
            .contains(&Violation::RepeatedCharacters));
    }

    #[test]
    fn sequences_rejected() {
        assert!(validate("Xabc#1!z").contains(&Violation::SequentialCharacters));
        assert!(validate("X789#aW!").contains(&Violation::SequentialCharacters));
        assert!(validate("Xqwerty#1A").contains(&Violation::SequentialCharacters));
        // Descending and wrap-around runs are not sequences.
        assert!(!validate("Xcba#1!zW9").contains(&Violation::SequentialCharacters));
        assert!(!validate("Xyza#1!W").contains(&Violation::SequentialCharacters));
    }

    #[test]
    fn mixed_alnum_is_not_a_sequence() {
        // 'y', 'z', '0' are consecutive code points but mix classes.
        assert!(!validate("Wyz0#t!Q").contains(&Violation::SequentialCharacters));
    }

    #[test]
    fn surrounding_whitespace_rejected() {
        assert!(validate(" Passw0rd!").contains(&Violation::SurroundingWhitespace));
        assert!(validate("Passw0rd! ").contains(&Violation::SurroundingWhitespace));
        // Inner whitespace is allowed.
        assert!(!validate("Pass w0rd!").contains(&Violation::SurroundingWhitespace));
    }

    #[test]
    fn denylist_matches_substrings_case_insensitively() {
        assert!(validate("XxPaSsWoRdYy#7").contains(&Violation::TooCommon));
        assert!(validate("MyAdmin#77").contains(&Violation::TooCommon));
    }

    #[test]
    fn score_caps_and_classes() {
        assert_eq!(strength_score(""), 0);
        // 4 chars, lowercase only: 8 + 15.
        assert_eq!(strength_score("abcd"), 23);
        // 20+ chars with all four classes: 40 + 60 = 100.
        assert_eq!(strength_score("Aa1!Aa1!Aa1!Aa1!Aa1!"), 100);
        // Score is independent of policy acceptance.
        assert_eq!(strength_score("aaaaaaaaaaaaaaaaaaaa"), 55);
    }

    #[test]
    fn score_never_exceeds_100() {
        let long = format!("Aa1!{}", "Aa1!".repeat(64));
        assert_eq!(strength_score(&long), 100);
    }
}
