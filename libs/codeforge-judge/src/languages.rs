// Language name -> judge language id mapping.
// This table is the single source of truth for both the trial-run and
// graded-submit paths; handlers never translate names inline.

use crate::error::EvalError;

/// Accepted names and aliases with their judge language ids.
const LANGUAGES: &[(&str, u32)] = &[
    ("c++", 54),
    ("cpp", 54),
    ("java", 62),
    ("javascript", 63),
    ("js", 63),
];

/// Resolve a human-readable language name to the judge's numeric id.
/// Lookup is case-insensitive; unknown names fail before any dispatch.
pub fn resolve(name: &str) -> Result<u32, EvalError> {
    let lookup = name.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(alias, _)| *alias == lookup)
        .map(|(_, id)| *id)
        .ok_or_else(|| EvalError::UnsupportedLanguage {
            name: name.to_string(),
        })
}

/// All accepted names, for CLI listing and error messages
pub fn supported_names() -> impl Iterator<Item = &'static str> {
    LANGUAGES.iter().map(|(alias, _)| *alias)
}
