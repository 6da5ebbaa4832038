//! Universe: the ordered list of symbols to screen.
//!
//! Accepted text format, one entry per line:
//! - `7203` or `7203.T`: symbol only
//! - `7203,Toyota Motor`: symbol and display name
//! - blank lines and lines starting with `#` are ignored
//!
//! A header line whose first field is `symbol`/`code` (any case) is skipped.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to read universe file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("universe is empty")]
    Empty,
}

/// Normalize a raw exchange code. Bare codes get the Tokyo `.T` suffix.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim().trim_matches('"').trim();
    if s.is_empty() {
        return None;
    }
    let upper = s.to_uppercase();
    if upper.contains('.') || upper.starts_with('^') {
        Some(upper)
    } else {
        Some(format!("{upper}.T"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseEntry {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Universe {
    entries: Vec<UniverseEntry>,
}

impl Universe {
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut universe = Self::default();
        for s in symbols {
            if let Some(symbol) = normalize_symbol(s.as_ref()) {
                universe.push(symbol.clone(), symbol);
            }
        }
        universe
    }

    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, UniverseError> {
        let mut universe = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (code, name) = match line.split_once(',') {
                Some((code, name)) => (code, name.trim().trim_matches('"')),
                None => (line, ""),
            };
            let first = code.trim().to_lowercase();
            if first == "symbol" || first == "code" {
                continue;
            }
            let Some(symbol) = normalize_symbol(code) else {
                continue;
            };
            let name = if name.is_empty() {
                symbol.clone()
            } else {
                name.to_string()
            };
            universe.push(symbol, name);
        }
        if universe.entries.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(universe)
    }

    /// Append unless the symbol is already present (first occurrence wins).
    fn push(&mut self, symbol: String, name: String) {
        if !self.entries.iter().any(|e| e.symbol == symbol) {
            self.entries.push(UniverseEntry { symbol, name });
        }
    }

    pub fn entries(&self) -> &[UniverseEntry] {
        &self.entries
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
