//! Codeset name to CCSID resolution.

use super::Ccsid;

/// Maps a codeset name (as used by `nl_langinfo(CODESET)`, iconv, or file
/// tagging tools) to a CCSID.
pub trait CodesetResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Ccsid>;
}

/// Named codesets that are not spelled as a number. Keys are normalised:
/// upper case with `-`, `_`, `.` and spaces removed.
const NAMED_CODESETS: &[(&str, u16)] = &[
    ("ISO88591", 819),
    ("LATIN1", 819),
    ("ISO885915", 923),
    ("LATIN9", 923),
    ("ASCII", 367),
    ("USASCII", 367),
    ("ANSIX341968", 367),
    ("UTF8", 1208),
    ("UTF16", 1200),
    ("UTF16BE", 1200),
    ("EBCDICCPUS", 37),
    ("WINDOWS1252", 1252),
];

/// Prefixes a numeric CCSID must carry (`IBM-1047`, `CP037`, `CCSID819`).
/// A bare number is not a codeset name.
const NUMERIC_PREFIXES: &[&str] = &["IBM", "CCSID", "CP"];

/// Built-in codeset table.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodesetTable;

impl CodesetTable {
    fn normalise(name: &str) -> String {
        name.trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '.' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    fn numeric(key: &str) -> Option<Ccsid> {
        let digits = NUMERIC_PREFIXES
            .iter()
            .find_map(|prefix| key.strip_prefix(prefix))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u16>().ok().and_then(Ccsid::new)
    }
}

impl CodesetResolver for CodesetTable {
    fn resolve(&self, name: &str) -> Option<Ccsid> {
        let key = Self::normalise(name);
        if key.is_empty() {
            return None;
        }
        NAMED_CODESETS
            .iter()
            .find(|(known, _)| *known == key)
            .and_then(|&(_, raw)| Ccsid::new(raw))
            .or_else(|| Self::numeric(&key))
    }
}
