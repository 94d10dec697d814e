//! LIWC-style lexicon features.
//!
//! Each category is a fixed word list. Entries ending in `*` match any word with that
//! prefix. Lists are compiled once on first use and shared read-only afterwards.
//! Words are written in their normalized form (no apostrophes), since matching runs
//! against the normalized message.

use crate::core::features::basic::count_words;
use crate::table::ChatMessage;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lexicon categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexiconCategory {
    FirstPersonSingular,
    FirstPersonPlural,
    SecondPerson,
    PositiveEmotion,
    NegativeEmotion,
    Certainty,
    Tentative,
    Agreement,
    Negation,
}

impl LexiconCategory {
    /// Categories emitted as `<name>_lexical_ratio` columns, in column order.
    ///
    /// First-person singular is reported separately as `first_pronouns_proportion`.
    pub const RATIO_FEATURES: [LexiconCategory; 8] = [
        LexiconCategory::FirstPersonPlural,
        LexiconCategory::SecondPerson,
        LexiconCategory::PositiveEmotion,
        LexiconCategory::NegativeEmotion,
        LexiconCategory::Certainty,
        LexiconCategory::Tentative,
        LexiconCategory::Agreement,
        LexiconCategory::Negation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LexiconCategory::FirstPersonSingular => "first_person_singular",
            LexiconCategory::FirstPersonPlural => "first_person_plural",
            LexiconCategory::SecondPerson => "second_person",
            LexiconCategory::PositiveEmotion => "positive_emotion",
            LexiconCategory::NegativeEmotion => "negative_emotion",
            LexiconCategory::Certainty => "certainty",
            LexiconCategory::Tentative => "tentative",
            LexiconCategory::Agreement => "agreement",
            LexiconCategory::Negation => "negation",
        }
    }

    pub fn column_name(&self) -> String {
        format!("{}_lexical_ratio", self.name())
    }

    fn words(&self) -> &'static [&'static str] {
        match self {
            // Contractions that collide with ordinary words once apostrophes are
            // stripped ("i'll" -> "ill", "we're" -> "were") are left out.
            LexiconCategory::FirstPersonSingular => {
                &["i", "me", "my", "mine", "myself", "im", "ive"]
            }
            LexiconCategory::FirstPersonPlural => &[
                "we", "us", "our", "ours", "ourselves", "weve", "lets",
            ],
            LexiconCategory::SecondPerson => &[
                "you", "your", "yours", "yourself", "yourselves", "youre", "youve", "youll",
                "youd", "u", "ur", "ya", "yall",
            ],
            LexiconCategory::PositiveEmotion => &[
                "good", "great", "nice", "love*", "like", "liked", "happ*", "glad", "awesome",
                "cool", "fun*", "excel*", "wonderf*", "best", "thank*", "enjoy*", "perfect*",
                "amazing", "haha*", "lol", "yay", "hope*", "win*", "fantastic",
            ],
            LexiconCategory::NegativeEmotion => &[
                "bad", "hate*", "awful", "terribl*", "horribl*", "sad*", "angry", "anger*",
                "annoy*", "worr*", "afraid", "fear*", "upset*", "wrong*", "stupid*", "ugh",
                "sorry", "hurt*", "fail*", "lose", "lost", "mad", "frustrat*", "boring",
            ],
            LexiconCategory::Certainty => &[
                "always", "never", "definite*", "certain*", "sure*", "absolute*", "clear*",
                "obvious*", "exact*", "total*", "complete*", "must", "undoubt*", "fact",
                "truly", "indeed", "everything", "nothing",
            ],
            LexiconCategory::Tentative => &[
                "maybe", "perhaps", "guess*", "possib*", "probab*", "might", "seem*", "somewhat",
                "unsure", "unclear", "think", "thinking", "suppose*", "hope", "kinda", "sorta",
                "almost", "apparent*", "depend*", "or",
            ],
            LexiconCategory::Agreement => &[
                "yes", "yeah", "yep", "yup", "ok", "okay", "agree*", "right", "exactly",
                "true", "correct", "sure", "absolutely", "totally", "alright",
            ],
            LexiconCategory::Negation => &[
                "no", "not", "never", "none", "nobody", "nothing", "nope", "nah", "neither",
                "nor", "dont", "cant", "wont", "didnt", "doesnt", "isnt", "arent", "wasnt",
                "werent", "shouldnt", "wouldnt", "couldnt", "havent", "hasnt", "aint",
            ],
        }
    }
}

/// A compiled word list.
#[derive(Debug)]
pub struct Lexicon {
    exact: HashSet<&'static str>,
    prefixes: Vec<&'static str>,
}

impl Lexicon {
    fn compile(words: &'static [&'static str]) -> Self {
        let mut exact = HashSet::new();
        let mut prefixes = Vec::new();
        for word in words {
            match word.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix),
                None => {
                    exact.insert(*word);
                }
            }
        }
        Self { exact, prefixes }
    }

    /// Whether a single normalized token belongs to the lexicon.
    pub fn contains(&self, word: &str) -> bool {
        self.exact.contains(word) || self.prefixes.iter().any(|p| word.starts_with(p))
    }

    /// Number of tokens in `text` that belong to the lexicon.
    pub fn count_matches(&self, text: &str) -> usize {
        text.split_whitespace().filter(|w| self.contains(w)).count()
    }
}

static LEXICONS: Lazy<HashMap<LexiconCategory, Lexicon>> = Lazy::new(|| {
    let all = LexiconCategory::RATIO_FEATURES
        .iter()
        .chain(std::iter::once(&LexiconCategory::FirstPersonSingular));
    all.map(|c| (*c, Lexicon::compile(c.words()))).collect()
});

/// The compiled lexicon for a category.
pub fn lexicon(category: LexiconCategory) -> &'static Lexicon {
    // Every category is inserted when the map is built.
    &LEXICONS[&category]
}

/// Fraction of words in `text` that belong to `category`; 0 for empty text.
pub fn lexicon_ratio(text: &str, category: LexiconCategory) -> f64 {
    let total = count_words(text);
    if total == 0 {
        return 0.0;
    }
    lexicon(category).count_matches(text) as f64 / total as f64
}

/// Number of first-person singular pronouns in the normalized message.
pub fn first_person_singular_count(message: &ChatMessage) -> usize {
    lexicon(LexiconCategory::FirstPersonSingular).count_matches(&message.message)
}

/// Share of words that are first-person singular pronouns.
pub fn first_pronouns_proportion(message: &ChatMessage) -> f64 {
    lexicon_ratio(&message.message, LexiconCategory::FirstPersonSingular)
}
