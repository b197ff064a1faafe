//! Advisory password strength meter for registration forms.
//! Scoring never blocks registration; only the minimum length does.

use serde::Serialize;

const SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Strength {
    /// 0..=5, one point per satisfied rule
    pub score: u8,
    pub label: &'static str,
    pub suggestions: Vec<&'static str>,
}

pub fn assess(password: &str) -> Strength {
    if password.is_empty() {
        return Strength { score: 0, label: label_for(0), suggestions: Vec::new() };
    }
    let rules: [(bool, &'static str); 5] = [
        (password.encode_utf16().count() >= 8, "At least 8 characters"),
        (password.chars().any(|c| c.is_ascii_lowercase()), "At least one lowercase letter"),
        (password.chars().any(|c| c.is_ascii_uppercase()), "At least one uppercase letter"),
        (password.chars().any(|c| c.is_ascii_digit()), "At least one number"),
        (password.chars().any(|c| SPECIALS.contains(c)), "At least one special character"),
    ];
    let score = rules.iter().filter(|(ok, _)| *ok).count() as u8;
    let suggestions = rules.iter().filter(|(ok, _)| !*ok).map(|(_, s)| *s).collect();
    Strength { score, label: label_for(score), suggestions }
}

fn label_for(score: u8) -> &'static str {
    match score {
        0 | 1 => "Very Weak",
        2 => "Weak",
        3 => "Fair",
        4 => "Good",
        _ => "Strong",
    }
}
