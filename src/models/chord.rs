use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AppError, AppResult};

/// A set of chord identifiers someone can play
pub type ChordSet = HashSet<String>;

/// A chord in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chord {
    pub id: String,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Relative complexity, lower is easier
    #[serde(default)]
    pub difficulty: Option<u8>,
}

impl Chord {
    /// A chord known only by its symbol
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            notes: Vec::new(),
            difficulty: None,
        }
    }
}

const ENHARMONIC_ROOTS: [(&str, &str); 4] = [("B#", "C"), ("E#", "F"), ("Cb", "B"), ("Fb", "E")];

/// Normalizes a chord symbol to the catalog's spelling.
///
/// Accepts the spellings found in imported song data: `Amin7` becomes `Am7`,
/// `Fs` becomes `F#`, `B#` becomes `C`, `Eno3d` becomes `Eno3` and `A#us2`
/// becomes `A#sus2`. Slash chords normalize both halves. No-chord tokens and
/// symbols that do not start with a note letter are rejected.
pub fn normalize_chord_symbol(symbol: &str) -> AppResult<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(AppError::InvalidInput(
            "Chord identifier cannot be empty".to_string(),
        ));
    }

    if symbol == "N" || (symbol.starts_with('<') && symbol.ends_with('>')) {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not a chord",
            symbol
        )));
    }

    let normalized = match symbol.split_once('/') {
        Some((_, bass)) if bass.contains('/') => {
            return Err(AppError::InvalidInput(format!(
                "Chord '{}' has more than one bass note",
                symbol
            )));
        }
        Some((root, bass)) => format!("{}/{}", normalize_part(symbol, root)?, normalize_part(symbol, bass)?),
        None => normalize_part(symbol, symbol)?,
    };

    if !normalized
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '#' || c == '/')
    {
        return Err(AppError::InvalidInput(format!(
            "Chord '{}' contains unsupported characters",
            symbol
        )));
    }

    Ok(normalized)
}

fn normalize_part(symbol: &str, part: &str) -> AppResult<String> {
    let letter = part
        .chars()
        .next()
        .filter(|c| ('A'..='G').contains(c))
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Chord '{}' must start with a note A-G", symbol))
        })?;

    let rest = &part[1..];
    let (accidental, rest) = if let Some(rest) = rest.strip_prefix('#') {
        ("#", rest)
    } else if rest.starts_with('s') && !rest.starts_with("sus") {
        ("#", &rest[1..])
    } else if let Some(rest) = rest.strip_prefix('b') {
        ("b", rest)
    } else {
        ("", rest)
    };

    let mut note = format!("{}{}", letter, accidental);
    if let Some((_, fixed)) = ENHARMONIC_ROOTS.iter().find(|(wrong, _)| *wrong == note) {
        note = fixed.to_string();
    }

    let mut quality = rest.replace("min", "m").replace("no3d", "no3");
    if quality.starts_with("us") {
        quality.insert(0, 's');
    }

    Ok(format!("{}{}", note, quality))
}

/// Normalizes every identifier in `ids` into a chord set
pub fn parse_chord_set<I, S>(ids: I) -> AppResult<ChordSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| normalize_chord_symbol(id.as_ref()))
        .collect()
}
