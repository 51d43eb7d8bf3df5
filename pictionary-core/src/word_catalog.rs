use std::collections::HashSet;
use std::path::Path;

use pictionary_types::{Difficulty, Word};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::guess_matcher::normalize;

const BUILTIN_WORDS: &str = include_str!("../data/pictionary-words.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("word catalog is empty")]
    EmptyCatalog,
    #[error("failed to read word catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse word catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fixed corpus of drawable words, loaded once at start-up.
#[derive(Debug, Clone)]
pub struct WordCatalog {
    words: Vec<Word>,
}

impl WordCatalog {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// Parse a JSON array of `{word, emoji, difficulty}` entries
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let words: Vec<Word> = serde_json::from_str(json)?;
        Ok(Self::new(words))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::info!("Loaded {} words from {}", catalog.word_count(), path.display());
        Ok(catalog)
    }

    /// The corpus bundled with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_WORDS)
    }

    /// Pick a word whose text is not in `excluding`. When every word is
    /// excluded the whole corpus is eligible again.
    pub fn select_random(&self, excluding: &HashSet<String>) -> Result<Word, CatalogError> {
        self.select_random_with(excluding, &mut rand::thread_rng())
    }

    pub fn select_random_with<R: Rng + ?Sized>(
        &self,
        excluding: &HashSet<String>,
        rng: &mut R,
    ) -> Result<Word, CatalogError> {
        let excluded: HashSet<String> = excluding.iter().map(|text| normalize(text)).collect();

        let available: Vec<&Word> = self
            .words
            .iter()
            .filter(|word| !excluded.contains(&normalize(&word.text)))
            .collect();

        let candidates: Vec<&Word> = if available.is_empty() {
            tracing::debug!("All {} words excluded, selecting from full catalog", self.words.len());
            self.words.iter().collect()
        } else {
            available
        };

        candidates
            .choose(rng)
            .map(|word| (*word).clone())
            .ok_or(CatalogError::EmptyCatalog)
    }

    pub fn words_by_difficulty(&self, difficulty: Difficulty) -> Vec<&Word> {
        self.words
            .iter()
            .filter(|word| word.difficulty == difficulty)
            .collect()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, text: &str) -> bool {
        let text = normalize(text);
        self.words.iter().any(|word| normalize(&word.text) == text)
    }
}
