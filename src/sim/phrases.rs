//! Practice phrase rotation

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::settings::PhraseOrder;

/// Built-in practice chunks
pub const DEFAULT_PHRASES: &[&str] = &[
    "Hello world",
    "How are you?",
    "Nice to meet you",
    "What's your name?",
    "I'm fine, thanks",
    "See you later",
    "Have a good day",
    "Take care",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseSequencer {
    phrases: Vec<String>,
    index: usize,
    order: PhraseOrder,
}

impl Default for PhraseSequencer {
    fn default() -> Self {
        Self::new(
            DEFAULT_PHRASES.iter().map(|s| s.to_string()).collect(),
            PhraseOrder::default(),
        )
    }
}

impl PhraseSequencer {
    /// An empty list falls back to the built-in phrases
    pub fn new(phrases: Vec<String>, order: PhraseOrder) -> Self {
        let phrases = if phrases.is_empty() {
            log::warn!("Empty phrase list, using built-in phrases");
            DEFAULT_PHRASES.iter().map(|s| s.to_string()).collect()
        } else {
            phrases
        };
        Self {
            phrases,
            index: 0,
            order,
        }
    }

    pub fn current(&self) -> &str {
        &self.phrases[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Move to the next phrase and return it
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> &str {
        self.index = match self.order {
            PhraseOrder::Sequential => (self.index + 1) % self.phrases.len(),
            PhraseOrder::Random => rng.random_range(0..self.phrases.len()),
        };
        self.current()
    }

    /// Back to the first phrase
    pub fn rewind(&mut self) {
        self.index = 0;
    }
}
