//! # Ingredient and Allergen Analysis
//!
//! This module turns raw OCR text from a food package into an [`AnalysisOutcome`]:
//! which ingredients were recognised, which allergens they imply, and whether
//! any of those allergens are on the user's personal list.
//!
//! ## Pipeline
//!
//! ```text
//! OCR text ──► normalize_text ──┬──► IngredientMatcher ──┐
//!                               │                        ├──► AnalysisOutcome
//!                               └──► AllergenMatcher ──► personalize ──┘
//! ```
//!
//! Every stage is a pure function over its inputs. Matching is plain substring
//! containment on the lowercased text, in table order, so results are
//! deterministic and each table key is reported at most once.
//!
//! ## Vocabularies
//!
//! The keyword tables are Romanian, matching the labels the bot is built for.
//! Lookups are Unicode-aware (`"GRÂU"` lowercases to `"grâu"`).

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Confidence attached to every keyword match
pub const DEFAULT_INGREDIENT_CONFIDENCE: f32 = 0.85;

/// Ingredient keywords recognised on packaging, in reporting order
pub const INGREDIENT_VOCABULARY: &[&str] = &[
    "făină",
    "zahăr",
    "ulei",
    "sare",
    "apă",
    "drojdie",
    "lapte",
    "ouă",
    "unt",
    "vanilie",
    "cacao",
    "ciocolată",
    "miere",
    "grâu",
    "porumb",
    "orez",
    "smântână",
    "zer",
    "cazeină",
];

/// Ingredient keywords that are themselves allergens
pub const ALLERGEN_INGREDIENTS: &[&str] = &[
    "făină", "grâu", "lapte", "ouă", "ou", "soia", "nuci", "cazeină",
];

/// Allergen keywords and their static severity, in reporting order
pub const ALLERGEN_SEVERITIES: &[(&str, Severity)] = &[
    ("gluten", Severity::High),
    ("grâu", Severity::High),
    ("făină", Severity::High),
    ("lapte", Severity::Medium),
    ("lactoza", Severity::Medium),
    ("cazeină", Severity::Medium),
    ("ouă", Severity::Medium),
    ("ou", Severity::Medium),
    ("soia", Severity::Low),
    ("nuci", Severity::High),
    ("arahide", Severity::High),
    ("susan", Severity::Medium),
];

/// Allergens offered when a user sets up their profile
pub const PERSONAL_ALLERGEN_CATALOG: &[&str] = &[
    "Gluten",
    "Lactoza",
    "Ouă",
    "Nuci",
    "Arahide",
    "Soia",
    "Pește",
    "Crustacee",
    "Susan",
    "Muștar",
    "Telină",
    "Lupin",
];

lazy_static! {
    static ref DEFAULT_ANALYZER: TextAnalyzer = TextAnalyzer::default();
}

/// Static severity classification of an allergen
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    /// All severities from lowest to highest
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// Canonical upper-case name, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }

    /// Localization key for the human readable label
    pub fn label_key(&self) -> &'static str {
        match self {
            Severity::Low => "severity-low",
            Severity::Medium => "severity-medium",
            Severity::High => "severity-high",
        }
    }

    /// Emoji badge used in chat messages
    pub fn badge(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟠",
            Severity::High => "🔴",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "scăzut" | "scazut" => Ok(Severity::Low),
            "medium" | "mediu" => Ok(Severity::Medium),
            "high" | "ridicat" => Ok(Severity::High),
            _ => Err("error-invalid-severity"),
        }
    }
}

/// An ingredient keyword found in the scanned text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientMatch {
    /// The lowercase keyword that matched
    pub text: String,
    /// Fixed placeholder confidence
    pub confidence: f32,
    /// Whether the keyword is itself an allergen
    pub is_allergen: bool,
}

/// An allergen keyword found in the scanned text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergenMatch {
    /// The lowercase keyword that matched
    pub name: String,
    /// Table severity, possibly elevated by personalization
    pub severity: Severity,
}

/// Result of analysing one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub source_text: String,
    pub ingredients: Vec<IngredientMatch>,
    pub allergens: Vec<AllergenMatch>,
    pub personal_match_detected: bool,
    pub personal_match_names: Vec<String>,
}

impl AnalysisOutcome {
    /// True when at least one allergen was detected
    pub fn has_allergens(&self) -> bool {
        !self.allergens.is_empty()
    }

    /// Allergens whose severity reaches `threshold`, in detection order
    pub fn allergens_at_or_above(&self, threshold: Severity) -> Vec<&AllergenMatch> {
        self.allergens
            .iter()
            .filter(|allergen| allergen.severity >= threshold)
            .collect()
    }

    /// Highest severity among detected allergens
    pub fn highest_severity(&self) -> Option<Severity> {
        self.allergens.iter().map(|allergen| allergen.severity).max()
    }

    /// Names of ingredients flagged as allergens
    pub fn allergen_ingredient_names(&self) -> Vec<&str> {
        self.ingredients
            .iter()
            .filter(|ingredient| ingredient.is_allergen)
            .map(|ingredient| ingredient.text.as_str())
            .collect()
    }
}

/// Output of the personalization step
#[derive(Debug, Clone, PartialEq)]
pub struct Personalization {
    pub allergens: Vec<AllergenMatch>,
    pub personal_match_detected: bool,
    pub personal_match_names: Vec<String>,
}

/// Lowercase raw OCR text for keyword matching
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

/// Fold an allergen name for case-insensitive comparison
pub fn fold_allergen_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Matches the ingredient vocabulary against normalized text
#[derive(Debug, Clone)]
pub struct IngredientMatcher {
    vocabulary: Vec<String>,
    allergen_ingredients: HashSet<String>,
    confidence: f32,
}

impl Default for IngredientMatcher {
    fn default() -> Self {
        Self::with_vocabulary(INGREDIENT_VOCABULARY, ALLERGEN_INGREDIENTS)
    }
}

impl IngredientMatcher {
    /// Create a matcher over the built-in Romanian vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher over a custom vocabulary
    ///
    /// Keywords are folded to lowercase. A keyword listed twice is kept at its
    /// first position only.
    pub fn with_vocabulary<I, J, S, T>(vocabulary: I, allergen_ingredients: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for keyword in vocabulary {
            let folded = fold_allergen_name(keyword.as_ref());
            if folded.is_empty() {
                continue;
            }
            if seen.insert(folded.clone()) {
                keywords.push(folded);
            } else {
                warn!(keyword = %folded, "Duplicate ingredient keyword ignored");
            }
        }

        Self {
            vocabulary: keywords,
            allergen_ingredients: allergen_ingredients
                .into_iter()
                .map(|keyword| fold_allergen_name(keyword.as_ref()))
                .filter(|keyword| !keyword.is_empty())
                .collect(),
            confidence: DEFAULT_INGREDIENT_CONFIDENCE,
        }
    }

    /// The keywords this matcher looks for, in reporting order
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Return every vocabulary keyword contained in `normalized_text`
    pub fn detect(&self, normalized_text: &str) -> Vec<IngredientMatch> {
        if normalized_text.is_empty() {
            return Vec::new();
        }

        self.vocabulary
            .iter()
            .filter(|keyword| normalized_text.contains(keyword.as_str()))
            .map(|keyword| {
                trace!(keyword = %keyword, "Ingredient keyword matched");
                IngredientMatch {
                    text: keyword.clone(),
                    confidence: self.confidence,
                    is_allergen: self.allergen_ingredients.contains(keyword),
                }
            })
            .collect()
    }
}

/// Matches the allergen severity table against normalized text
#[derive(Debug, Clone)]
pub struct AllergenMatcher {
    table: Vec<(String, Severity)>,
}

impl Default for AllergenMatcher {
    fn default() -> Self {
        Self::with_table(ALLERGEN_SEVERITIES.iter().copied())
    }
}

impl AllergenMatcher {
    /// Create a matcher over the built-in severity table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher over a custom table
    ///
    /// Duplicate keys keep their first position and severity.
    pub fn with_table<I, S>(table: I) -> Self
    where
        I: IntoIterator<Item = (S, Severity)>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (name, severity) in table {
            let folded = fold_allergen_name(name.as_ref());
            if folded.is_empty() {
                continue;
            }
            if seen.insert(folded.clone()) {
                entries.push((folded, severity));
            } else {
                warn!(allergen = %folded, "Duplicate allergen key ignored");
            }
        }
        Self { table: entries }
    }

    /// The allergen table, in reporting order
    pub fn table(&self) -> &[(String, Severity)] {
        &self.table
    }

    /// Static severity for `name`, if it is in the table
    pub fn severity_of(&self, name: &str) -> Option<Severity> {
        let folded = fold_allergen_name(name);
        self.table
            .iter()
            .find(|(key, _)| *key == folded)
            .map(|(_, severity)| *severity)
    }

    /// Return every table entry whose key is contained in `normalized_text`
    pub fn detect(&self, normalized_text: &str) -> Vec<AllergenMatch> {
        if normalized_text.is_empty() {
            return Vec::new();
        }

        self.table
            .iter()
            .filter(|(name, _)| normalized_text.contains(name.as_str()))
            .map(|(name, severity)| AllergenMatch {
                name: name.clone(),
                severity: *severity,
            })
            .collect()
    }
}

/// Intersect detected allergens with the user's personal allergen list
///
/// Names are compared after trimming and lowercasing both sides; a personal
/// entry must equal the detected keyword, not merely contain it. Every match
/// is raised to [`Severity::High`]. Running this again on its own output
/// yields the same severities.
pub fn personalize<S: AsRef<str>>(detected: &[AllergenMatch], personal: &[S]) -> Personalization {
    let personal: HashSet<String> = personal
        .iter()
        .map(|name| fold_allergen_name(name.as_ref()))
        .filter(|name| !name.is_empty())
        .collect();

    let mut personal_match_names: Vec<String> = Vec::new();
    let allergens = detected
        .iter()
        .map(|allergen| {
            let folded = fold_allergen_name(&allergen.name);
            if personal.contains(&folded) {
                if !personal_match_names.contains(&folded) {
                    personal_match_names.push(folded);
                }
                AllergenMatch {
                    name: allergen.name.clone(),
                    severity: Severity::High,
                }
            } else {
                allergen.clone()
            }
        })
        .collect();

    Personalization {
        allergens,
        personal_match_detected: !personal_match_names.is_empty(),
        personal_match_names,
    }
}

/// The full text analysis pipeline
#[derive(Debug, Clone, Default)]
pub struct TextAnalyzer {
    ingredients: IngredientMatcher,
    allergens: AllergenMatcher,
}

impl TextAnalyzer {
    /// Create an analyzer over the built-in tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer from custom matchers
    pub fn with_matchers(ingredients: IngredientMatcher, allergens: AllergenMatcher) -> Self {
        Self {
            ingredients,
            allergens,
        }
    }

    /// Analyse `text` against the user's personal allergens
    pub fn analyze<S: AsRef<str>>(&self, text: &str, personal_allergens: &[S]) -> AnalysisOutcome {
        let normalized = normalize_text(text);
        let ingredients = self.ingredients.detect(&normalized);
        let detected = self.allergens.detect(&normalized);
        let personalization = personalize(&detected, personal_allergens);

        debug!(
            text_length = text.len(),
            ingredients_found = ingredients.len(),
            allergens_found = personalization.allergens.len(),
            personal_match = personalization.personal_match_detected,
            "Text analysis completed"
        );

        AnalysisOutcome {
            source_text: text.to_string(),
            ingredients,
            allergens: personalization.allergens,
            personal_match_detected: personalization.personal_match_detected,
            personal_match_names: personalization.personal_match_names,
        }
    }
}

/// Analyse `text` with the built-in tables
pub fn analyze<S: AsRef<str>>(text: &str, personal_allergens: &[S]) -> AnalysisOutcome {
    DEFAULT_ANALYZER.analyze(text, personal_allergens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_have_unique_keys() {
        let vocabulary: HashSet<&str> = INGREDIENT_VOCABULARY.iter().copied().collect();
        assert_eq!(vocabulary.len(), INGREDIENT_VOCABULARY.len());

        let allergens: HashSet<&str> = ALLERGEN_SEVERITIES.iter().map(|(k, _)| *k).collect();
        assert_eq!(allergens.len(), ALLERGEN_SEVERITIES.len());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::High));
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!("high".parse::<Severity>(), Ok(Severity::High));
        assert_eq!(" Medium ".parse::<Severity>(), Ok(Severity::Medium));
        assert_eq!("LOW".parse::<Severity>(), Ok(Severity::Low));
        assert_eq!("ridicat".parse::<Severity>(), Ok(Severity::High));
        assert_eq!("extreme".parse::<Severity>(), Err("error-invalid-severity"));
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        let parsed: Severity = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(parsed, Severity::High);
    }

    #[test]
    fn test_normalize_text_handles_romanian_capitals() {
        assert_eq!(normalize_text("GRÂU și ZAHĂR"), "grâu și zahăr");
    }

    #[test]
    fn test_duplicate_table_keys_keep_first_entry() {
        let matcher = AllergenMatcher::with_table(vec![
            ("susan", Severity::Medium),
            ("Susan", Severity::High),
        ]);
        assert_eq!(matcher.table().len(), 1);
        assert_eq!(matcher.severity_of("susan"), Some(Severity::Medium));
    }

    #[test]
    fn test_personalize_elevates_only_personal_matches() {
        let detected = vec![
            AllergenMatch {
                name: "soia".to_string(),
                severity: Severity::Low,
            },
            AllergenMatch {
                name: "lapte".to_string(),
                severity: Severity::Medium,
            },
        ];

        let result = personalize(&detected, &["Soia"]);
        assert!(result.personal_match_detected);
        assert_eq!(result.personal_match_names, vec!["soia".to_string()]);
        assert_eq!(result.allergens[0].severity, Severity::High);
        assert_eq!(result.allergens[1].severity, Severity::Medium);
    }

    #[test]
    fn test_personalize_with_empty_list() {
        let detected = vec![AllergenMatch {
            name: "nuci".to_string(),
            severity: Severity::High,
        }];
        let empty: [&str; 0] = [];
        let result = personalize(&detected, &empty);
        assert!(!result.personal_match_detected);
        assert!(result.personal_match_names.is_empty());
        assert_eq!(result.allergens, detected);
    }

    #[test]
    fn test_outcome_threshold_helpers() {
        let outcome = analyze("făină, soia", &["soia"]);
        assert_eq!(outcome.highest_severity(), Some(Severity::High));
        // soia is elevated, so both reach HIGH
        assert_eq!(outcome.allergens_at_or_above(Severity::High).len(), 2);

        let outcome = analyze("soia", &Vec::<String>::new());
        assert_eq!(outcome.allergens_at_or_above(Severity::Medium).len(), 0);
        assert_eq!(outcome.allergens_at_or_above(Severity::Low).len(), 1);
    }
}
