//! Product name normalization
//!
//! The same cleaning runs on catalog text at build time and on queries at
//! match time, so both sides land in one comparable form: lowercase ASCII
//! words separated by single spaces.
//!
//! Order of operations:
//!
//! 1. strip all-uppercase tokens (brand codes, acronyms) on the original-case text
//! 2. lowercase
//! 3. expand known abbreviations (`toms` -> `tomatoes`)
//! 4. strip quantities (`500g`, `1.5 kg`, `330ml`)
//! 5. strip `no<digits>` codes and bare numbers
//! 6. strip generic marketing words (`organic`, `fresh`, ...)
//! 7. replace anything that is not `[a-z0-9]` or whitespace with a space
//! 8. collapse whitespace and trim
//!
//! Steps 3 through 8 repeat until the text stops changing. Step 7 can
//! expose new whole words (`organic_tomatoes`), and running to a fixpoint
//! is what makes `normalize(normalize(x)) == normalize(x)` hold.

use ahash::AHashMap;
use carbonmatch_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

static DEFAULT_NORMALIZER: Lazy<Normalizer> = Lazy::new(|| {
    Normalizer::new(NormalizerConfig::default()).expect("built-in normalizer word lists are valid")
});

/// Normalize `text` with the built-in word lists
pub fn normalize(text: &str) -> String {
    DEFAULT_NORMALIZER.normalize(text)
}

/// Word lists and switches for a [`Normalizer`].
///
/// Persisted next to a saved index so queries are cleaned with the same
/// lists as the catalog was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Whole-word shorthand -> canonical term
    pub abbreviations: Vec<(String, String)>,
    /// Whole-word phrases removed outright
    pub generic_prefixes: Vec<String>,
    /// Units recognised after a number
    pub units: Vec<String>,
    /// Drop all-uppercase tokens of two or more letters before lowercasing
    pub strip_acronyms: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let pairs = [
            ("cappuc", "cappuccino"),
            ("asprgs", "asparagus"),
            ("toms", "tomatoes"),
        ];
        Self {
            abbreviations: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            generic_prefixes: ["plant menu", "organic", "fresh", "brand", "pack", "pkg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            units: ["ml", "l", "g", "kg", "oz"].iter().map(|s| s.to_string()).collect(),
            strip_acronyms: true,
        }
    }
}

/// Compiled normalization pipeline
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    abbreviations: AHashMap<String, String>,
    abbreviation_re: Option<Regex>,
    acronym_re: Option<Regex>,
    quantity_re: Option<Regex>,
    ordinal_re: Regex,
    number_re: Regex,
    prefix_re: Option<Regex>,
    non_alnum_re: Regex,
    whitespace_re: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        DEFAULT_NORMALIZER.clone()
    }
}

impl Normalizer {
    /// Compile a normalizer from `config`.
    ///
    /// Abbreviation expansions may not contain an abbreviation as a whole
    /// word, checked after punctuation is folded to spaces. Otherwise the
    /// cleanup loop would keep rewriting forever.
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        let mut abbreviations = AHashMap::with_capacity(config.abbreviations.len());
        for (short, full) in &config.abbreviations {
            let short = short.trim().to_lowercase();
            if short.is_empty() {
                return Err(Error::InvalidConfig("empty abbreviation key".to_string()));
            }
            abbreviations.insert(short, full.trim().to_lowercase());
        }

        let abbreviation_re = word_alternation(abbreviations.keys().map(String::as_str))?;

        let quantity_re = match alternation(config.units.iter().map(String::as_str)) {
            Some(units) => Some(compile(&format!(
                r"\b[0-9]+(?:\.[0-9]+)?\s?(?:{})\b",
                units
            ))?),
            None => None,
        };

        let acronym_re = if config.strip_acronyms {
            Some(compile(r"\b[A-Z]{2,}\b")?)
        } else {
            None
        };

        let prefix_re = word_alternation(config.generic_prefixes.iter().map(String::as_str))?;
        let normalizer = Self {
            config,
            abbreviations,
            abbreviation_re,
            acronym_re,
            quantity_re,
            ordinal_re: compile(r"(?i)\bno[0-9]+\b")?,
            number_re: compile(r"\b[0-9]+\b")?,
            prefix_re,
            non_alnum_re: compile(r"[^a-z0-9\s]")?,
            whitespace_re: compile(r"\s+")?,
        };

        if let Some(re) = &normalizer.abbreviation_re {
            for (short, full) in &normalizer.abbreviations {
                let folded = normalizer.non_alnum_re.replace_all(full, " ");
                if re.is_match(&folded) {
                    return Err(Error::InvalidConfig(format!(
                        "expansion '{}' of '{}' contains another abbreviation",
                        full, short
                    )));
                }
            }
        }
        Ok(normalizer)
    }

    /// Word lists this normalizer was compiled from
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Clean `text` into its canonical comparable form
    pub fn normalize(&self, text: &str) -> String {
        let text = match &self.acronym_re {
            Some(re) => re.replace_all(text, " "),
            None => Cow::Borrowed(text),
        };

        let mut current = text.to_lowercase();
        loop {
            let next = self.clean_pass(&current);
            if next == current {
                return next;
            }
            current = next;
        }
    }

    fn clean_pass(&self, text: &str) -> String {
        let mut text = Cow::Borrowed(text);

        if let Some(re) = &self.abbreviation_re {
            text = Cow::Owned(
                re.replace_all(&text, |caps: &Captures| {
                    self.abbreviations
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            );
        }
        if let Some(re) = &self.quantity_re {
            text = Cow::Owned(re.replace_all(&text, " ").into_owned());
        }

        let text = self.ordinal_re.replace_all(&text, " ");
        let text = self.number_re.replace_all(&text, " ");
        let text = match &self.prefix_re {
            Some(re) => Cow::Owned(re.replace_all(&text, " ").into_owned()),
            None => text,
        };
        let text = self.non_alnum_re.replace_all(&text, " ");
        let text = self.whitespace_re.replace_all(&text, " ");

        text.trim().to_string()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidConfig(format!("bad pattern {}: {}", pattern, e)))
}

/// `a|b|c` over escaped, lowercased, non-empty terms, longest first
fn alternation<'a>(terms: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut terms: Vec<String> = terms
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return None;
    }
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    terms.dedup();
    Some(
        terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

fn word_alternation<'a>(terms: impl Iterator<Item = &'a str>) -> Result<Option<Regex>> {
    match alternation(terms) {
        Some(alt) => compile(&format!(r"\b(?:{})\b", alt)).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_and_prefix_stripped() {
        assert_eq!(normalize("Fresh Tomatoes 500g"), "tomatoes");
        assert_eq!(normalize("Milk 2L"), "milk");
        assert_eq!(normalize("Olive Oil 1.5 l"), "olive oil");
        assert_eq!(normalize("Tuna 5oz tin"), "tuna tin");
        assert_eq!(normalize("Cola 330 ml"), "cola");
    }

    #[test]
    fn test_abbreviations_expand_on_whole_words() {
        assert_eq!(normalize("Organic Cappuc 250ml"), "cappuccino");
        assert_eq!(normalize("toms"), "tomatoes");
        assert_eq!(normalize("Asprgs spears"), "asparagus spears");
        assert_eq!(normalize("tomsauce"), "tomsauce");
    }

    #[test]
    fn test_acronyms_stripped_before_lowercasing() {
        assert_eq!(normalize("Heinz BBQ Sauce 1.5kg"), "heinz sauce");
        // Already-lowercase text keeps the token.
        assert_eq!(normalize("heinz bbq sauce"), "heinz bbq sauce");
        // Single capitals and mixed case are ordinary words.
        assert_eq!(normalize("A Pear"), "a pear");
        assert_eq!(normalize("UHT Milk"), "milk");
    }

    #[test]
    fn test_acronym_stripping_can_be_disabled() {
        let normalizer = Normalizer::new(NormalizerConfig {
            strip_acronyms: false,
            ..NormalizerConfig::default()
        })
        .unwrap();
        assert_eq!(normalizer.normalize("Heinz BBQ Sauce"), "heinz bbq sauce");
    }

    #[test]
    fn test_codes_and_numbers_stripped() {
        assert_eq!(normalize("Crisps NO1 Pack 12"), "crisps");
        assert_eq!(normalize("Blend no42 coffee"), "blend coffee");
        assert_eq!(normalize("Cereal 2024 edition"), "cereal edition");
        assert_eq!(normalize("Vitamin b12"), "vitamin b12");
    }

    #[test]
    fn test_generic_phrases_and_punctuation() {
        assert_eq!(normalize("Plant Menu Vegan Burger"), "vegan burger");
        assert_eq!(normalize("Brand-X Peas (frozen)"), "x peas frozen");
        assert_eq!(normalize("Rice & Beans!!"), "rice beans");
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
        assert_eq!(normalize("500g"), "");
    }

    #[test]
    fn test_words_exposed_by_punctuation_are_cleaned() {
        assert_eq!(normalize("organic_tomatoes"), "tomatoes");
        assert_eq!(normalize("beans_400g"), "beans");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Fresh Tomatoes 500g",
            "organic_tomatoes",
            "Café Crème 250ml",
            "x_12 fresh_fresh_fresh",
            "ÜBER-Snack NO7, 3 x 25g",
            "Heinz BBQ Sauce",
            "toms_toms",
            "plant\u{a0}menu  burger",
            "İstanbul Simit",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_output_alphabet() {
        let out = normalize("Crème brûlée — 2×100g, «premium»");
        assert!(out
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
        assert!(!out.contains("  "));
        assert_eq!(out, out.trim());
    }

    #[test]
    fn test_self_referential_abbreviation_rejected() {
        let err = Normalizer::new(NormalizerConfig {
            abbreviations: vec![
                ("tom".to_string(), "tom tomato".to_string()),
            ],
            ..NormalizerConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_abbreviation_exposed_by_punctuation_rejected() {
        // "crème" folds to "cr me", which would expand "me" again.
        let err = Normalizer::new(NormalizerConfig {
            abbreviations: vec![("me".to_string(), "crème".to_string())],
            ..NormalizerConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let ok = Normalizer::new(NormalizerConfig {
            abbreviations: vec![("crm".to_string(), "crème".to_string())],
            ..NormalizerConfig::default()
        })
        .unwrap();
        assert_eq!(ok.normalize("crm brulee"), "cr me brulee");
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let normalizer = Normalizer::default();
        let json = serde_json::to_string(normalizer.config()).unwrap();
        let config: NormalizerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(&config, normalizer.config());

        let partial: NormalizerConfig = serde_json::from_str(r#"{"strip_acronyms": false}"#).unwrap();
        assert!(!partial.strip_acronyms);
        assert_eq!(partial.units, NormalizerConfig::default().units);
    }

    #[test]
    fn test_custom_word_lists() {
        let normalizer = Normalizer::new(NormalizerConfig {
            abbreviations: vec![("choc".to_string(), "chocolate".to_string())],
            generic_prefixes: vec!["premium".to_string()],
            units: vec!["pcs".to_string()],
            strip_acronyms: true,
        })
        .unwrap();
        assert_eq!(normalizer.normalize("Premium Choc Bar 4pcs"), "chocolate bar");
        // Built-in lists are not active here.
        assert_eq!(normalizer.normalize("fresh choc 100g"), "fresh chocolate 100g");
    }
}
