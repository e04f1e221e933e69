use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::error::PipelineError;

const LIGUE1_NAMES: [(&str, &str); 18] = [
    ("Paris Saint-Germain FC", "Paris Saint-Germain"),
    ("Olympique de Marseille", "Marseille"),
    ("AS Monaco FC", "Monaco"),
    ("OGC Nice", "Nice"),
    ("Olympique Lyonnais", "Lyon"),
    ("RC Strasbourg Alsace", "Strasbourg"),
    ("Racing Club de Lens", "Lens"),
    ("Stade Brestois 29", "Brest"),
    ("AS Saint-Étienne", "Saint-Étienne"),
    ("Lille OSC", "Lille"),
    ("Stade Rennais FC 1901", "Rennes"),
    ("FC Nantes", "Nantes"),
    ("Montpellier HSC", "Montpellier"),
    ("Angers SCO", "Angers"),
    ("Stade de Reims", "Reims"),
    ("Le Havre AC", "Le Havre"),
    ("AJ Auxerre", "Auxerre"),
    ("Toulouse FC", "Toulouse"),
];

/// Looks `name` up in `table`, falling back to `name` itself.
pub fn canonical_name<'a>(table: &'a HashMap<String, String>, name: &'a str) -> &'a str {
    table.get(name).map(String::as_str).unwrap_or(name)
}

/// Official club names to short display names.
#[derive(Debug, Clone, Default)]
pub struct TeamNameMap {
    table: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct NameRow {
    official: String,
    short: String,
}

impl TeamNameMap {
    pub fn ligue1() -> Self {
        Self::from_pairs(LIGUE1_NAMES)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Reads an `official,short` CSV.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("open team name map {}", path.display()))?;

        let mut table = HashMap::new();
        for row in reader.deserialize::<NameRow>() {
            let row = row.with_context(|| format!("parse {}", path.display()))?;
            table.insert(row.official, row.short);
        }

        info!("Loaded {} team names from {}", table.len(), path.display());
        Ok(Self { table })
    }

    pub fn lookup(&self, name: &str) -> Result<&str, PipelineError> {
        self.table
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::UnmappedTeamName {
                name: name.to_string(),
            })
    }

    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        canonical_name(&self.table, name)
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Loose comparison key: accents folded, lowercase, `&` spelled out and
/// everything but ASCII letters and digits removed.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace('&', "and")
        .chars()
        .map(fold_accent)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Exact or substring match (either way) on normalised names.
pub fn is_same_team(wanted: &str, candidate: &str) -> bool {
    let wanted = normalize_name(wanted);
    if wanted.is_empty() {
        return false;
    }
    let candidate = normalize_name(candidate);
    candidate == wanted || candidate.contains(&wanted) || wanted.contains(&candidate)
}
