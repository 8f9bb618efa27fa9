//! # Anonymization Engine
//!
//! Detects sensitive spans (phone numbers, email addresses, people, places) in
//! free text and replaces each with a fixed placeholder for its kind before the
//! text leaves the pipeline for retrieval or generation.
//!
//! Detection is delegated to a list of [`Recognizer`]s. Their results are merged,
//! overlapping spans are resolved in favour of the most confident (then the
//! longest) match, and the survivors are substituted right to left so that byte
//! offsets stay valid.

pub mod recognizer;
pub mod remote;

pub use recognizer::{Pattern, PatternRecognizer, TermRecognizer};
pub use remote::RemoteAnalyzer;

use crate::{constants::DEFAULT_LANGUAGE, errors::PromptError, profile::ProfileStore};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::{cmp::Ordering, collections::HashMap, fmt::Debug};
use tracing::{debug, instrument};

pub const PHONE_NUMBER: &str = "PHONE_NUMBER";
pub const EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
pub const PERSON: &str = "PERSON";
pub const LOCATION: &str = "LOCATION";

/// Placeholder for any entity kind without a dedicated operator.
pub const DEFAULT_PLACEHOLDER: &str = "<SENSITIVE_DATA>";

/// One detected span. `start`/`end` are byte offsets into the analyzed text.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerResult {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
}

impl RecognizerResult {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn overlaps(&self, other: &RecognizerResult) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An entity-detection service.
#[async_trait]
pub trait Recognizer: Send + Sync + Debug + DynClone {
    fn name(&self) -> &str;

    /// Returns the spans of the requested `entities` found in `text`.
    async fn analyze(
        &self,
        text: &str,
        entities: &[String],
        language: &str,
    ) -> Result<Vec<RecognizerResult>, PromptError>;
}

dyn_clone::clone_trait_object!(Recognizer);

/// Replaces detected entities with per-kind placeholders.
#[derive(Debug, Clone)]
pub struct Anonymizer {
    recognizers: Vec<Box<dyn Recognizer>>,
    entities: Vec<String>,
    language: String,
    operators: HashMap<String, String>,
}

impl Anonymizer {
    /// An anonymizer with the default entity set, operators and language, and no
    /// recognizers.
    pub fn new() -> Self {
        let operators = [PHONE_NUMBER, EMAIL_ADDRESS, PERSON, LOCATION]
            .into_iter()
            .map(|kind| (kind.to_string(), format!("<{kind}>")))
            .collect();
        Self {
            recognizers: Vec::new(),
            entities: vec![
                PHONE_NUMBER.to_string(),
                EMAIL_ADDRESS.to_string(),
                PERSON.to_string(),
                LOCATION.to_string(),
            ],
            language: DEFAULT_LANGUAGE.to_string(),
            operators,
        }
    }

    /// An anonymizer with the built-in pattern rules: the locale phone rule,
    /// generic phone numbers and email addresses.
    pub fn with_default_recognizers() -> Result<Self, PromptError> {
        Ok(Self::new()
            .with_recognizer(Box::new(recognizer::indian_phone_recognizer()?))
            .with_recognizer(Box::new(recognizer::phone_recognizer()?))
            .with_recognizer(Box::new(recognizer::email_recognizer()?)))
    }

    /// Adds offline `PERSON` and `LOCATION` detection for the customer names and
    /// address places known to the profile store.
    pub fn with_profile_terms(self, profiles: &ProfileStore) -> Result<Self, PromptError> {
        let names = profiles.users().iter().flat_map(|user| {
            std::iter::once(user.name.clone())
                .chain(user.name.split_whitespace().map(str::to_string))
        });
        let places = profiles
            .stores()
            .iter()
            .flat_map(|store| store.location.address.split(','))
            .filter_map(place_term);

        Ok(self
            .with_recognizer(Box::new(TermRecognizer::people(names)?))
            .with_recognizer(Box::new(TermRecognizer::places(places)?)))
    }

    pub fn with_recognizer(mut self, recognizer: Box<dyn Recognizer>) -> Self {
        self.recognizers.push(recognizer);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Adds an entity kind to the detection request.
    pub fn with_entity(mut self, entity: &str) -> Self {
        if !self.entities.iter().any(|e| e == entity) {
            self.entities.push(entity.to_string());
        }
        self
    }

    /// Overrides the placeholder used for one entity kind.
    pub fn with_operator(mut self, entity: &str, placeholder: &str) -> Self {
        self.operators
            .insert(entity.to_string(), placeholder.to_string());
        self
    }

    pub fn placeholder_for(&self, entity: &str) -> &str {
        self.operators
            .get(entity)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PLACEHOLDER)
    }

    /// Runs every recognizer and returns the non-overlapping winners, ordered by
    /// start offset.
    pub async fn analyze(&self, text: &str) -> Result<Vec<RecognizerResult>, PromptError> {
        let mut results = Vec::new();
        for recognizer in &self.recognizers {
            let found = recognizer
                .analyze(text, &self.entities, &self.language)
                .await?;
            debug!(
                recognizer = recognizer.name(),
                hits = found.len(),
                "Recognizer finished."
            );
            results.extend(found.into_iter().filter(|r| {
                r.start < r.end
                    && r.end <= text.len()
                    && text.is_char_boundary(r.start)
                    && text.is_char_boundary(r.end)
            }));
        }
        Ok(resolve_conflicts(results))
    }

    /// Redacts `text`. Empty input is returned unchanged without running detection.
    #[instrument(skip_all)]
    pub async fn anonymize(&self, text: &str) -> Result<String, PromptError> {
        if text.is_empty() {
            return Ok(text.to_string());
        }

        let results = self.analyze(text).await?;
        let mut anonymized = text.to_string();
        for result in results.iter().rev() {
            anonymized.replace_range(
                result.start..result.end,
                self.placeholder_for(&result.entity_type),
            );
        }
        debug!(redactions = results.len(), "Anonymized text.");
        Ok(anonymized)
    }
}

impl Default for Anonymizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The place name in an address segment, without a trailing postal code.
/// Segments holding house or flat numbers are skipped.
fn place_term(segment: &str) -> Option<String> {
    let segment = segment.trim();
    let without_digits = segment.trim_end_matches(|c: char| c.is_ascii_digit());
    let name = if segment.len() - without_digits.len() >= 5 {
        without_digits.trim_end_matches(['-', ' '])
    } else {
        segment
    };
    if name.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    (name.chars().filter(|c| c.is_alphabetic()).count() > 3).then(|| name.to_string())
}

/// Keeps the best of every group of overlapping spans: highest score, then the
/// longest span, then the earliest start.
fn resolve_conflicts(mut results: Vec<RecognizerResult>) -> Vec<RecognizerResult> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut accepted: Vec<RecognizerResult> = Vec::with_capacity(results.len());
    for candidate in results {
        if accepted.iter().all(|kept| !kept.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }
    accepted.sort_by_key(|r| r.start);
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(entity: &str, start: usize, end: usize, score: f64) -> RecognizerResult {
        RecognizerResult {
            entity_type: entity.to_string(),
            start,
            end,
            score,
        }
    }

    #[test]
    fn higher_score_wins_overlap() {
        let resolved = resolve_conflicts(vec![
            result(PHONE_NUMBER, 0, 20, 0.4),
            result(PHONE_NUMBER, 3, 18, 1.0),
        ]);
        assert_eq!(resolved, vec![result(PHONE_NUMBER, 3, 18, 1.0)]);
    }

    #[test]
    fn longer_span_wins_equal_score() {
        let resolved = resolve_conflicts(vec![
            result(LOCATION, 5, 12, 0.85),
            result(LOCATION, 5, 17, 0.85),
            result(PERSON, 20, 24, 0.85),
        ]);
        assert_eq!(
            resolved,
            vec![result(LOCATION, 5, 17, 0.85), result(PERSON, 20, 24, 0.85)]
        );
    }

    #[test]
    fn place_terms_drop_postal_codes() {
        assert_eq!(place_term(" Mumbai - 400053"), Some("Mumbai".to_string()));
        assert_eq!(place_term(" Andheri West"), Some("Andheri West".to_string()));
        assert_eq!(place_term(" 42"), None);
        assert_eq!(place_term("Flat 12"), None);
        assert_eq!(place_term(" Goa"), None);
    }

    #[test]
    fn unknown_kind_uses_default_placeholder() {
        let anonymizer = Anonymizer::new();
        assert_eq!(anonymizer.placeholder_for("CREDIT_CARD"), DEFAULT_PLACEHOLDER);
        assert_eq!(anonymizer.placeholder_for(PERSON), "<PERSON>");
    }
}
