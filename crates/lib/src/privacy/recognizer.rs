//! Local, rule-based entity recognizers.

use super::{Recognizer, RecognizerResult, EMAIL_ADDRESS, LOCATION, PERSON, PHONE_NUMBER};
use crate::errors::PromptError;
use async_trait::async_trait;
use regex::Regex;

/// A named regular expression with the confidence assigned to its matches.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    pub regex: Regex,
    pub score: f64,
}

impl Pattern {
    pub fn new(name: &str, regex: &str, score: f64) -> Result<Self, PromptError> {
        Ok(Self {
            name: name.to_string(),
            regex: Regex::new(regex)?,
            score,
        })
    }
}

/// Detects a single entity kind through one or more regex patterns.
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    name: String,
    supported_entity: String,
    patterns: Vec<Pattern>,
}

impl PatternRecognizer {
    pub fn new(name: &str, supported_entity: &str, patterns: Vec<Pattern>) -> Self {
        Self {
            name: name.to_string(),
            supported_entity: supported_entity.to_string(),
            patterns,
        }
    }

    /// Matches spans synchronously; `analyze` wraps this.
    pub fn find(&self, text: &str) -> Vec<RecognizerResult> {
        self.patterns
            .iter()
            .flat_map(|pattern| {
                pattern.regex.find_iter(text).map(|m| RecognizerResult {
                    entity_type: self.supported_entity.clone(),
                    start: m.start(),
                    end: m.end(),
                    score: pattern.score,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Recognizer for PatternRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        text: &str,
        entities: &[String],
        _language: &str,
    ) -> Result<Vec<RecognizerResult>, PromptError> {
        if !entities.iter().any(|e| e == &self.supported_entity) {
            return Ok(Vec::new());
        }
        Ok(self.find(text))
    }
}

/// The locale rule for Indian mobile numbers written as `+91-ddddd-ddddd`.
///
/// Scored 1.0 so it always wins over the generic phone pattern on overlap.
pub fn indian_phone_recognizer() -> Result<PatternRecognizer, PromptError> {
    Ok(PatternRecognizer::new(
        "indian_phone_recognizer",
        PHONE_NUMBER,
        vec![Pattern::new("indian_phone_pattern", r"\+91-\d{5}-\d{5}", 1.0)?],
    ))
}

/// Generic phone numbers: international or local digit groups.
pub fn phone_recognizer() -> Result<PatternRecognizer, PromptError> {
    Ok(PatternRecognizer::new(
        "phone_recognizer",
        PHONE_NUMBER,
        vec![
            Pattern::new(
                "phone_international",
                r"\+\d{1,3}[\s.-]?\(?\d{2,5}\)?(?:[\s.-]?\d{2,5}){1,3}",
                0.5,
            )?,
            // Ten digits in 3-3-4 groups; shorter dashed ids such as order
            // numbers (`ORD-001-002`) are not phone numbers.
            Pattern::new("phone_local", r"\b\d{3}[\s.-]\d{3}[\s.-]\d{4}\b", 0.4)?,
            Pattern::new("phone_digits", r"\b\d{10}\b", 0.4)?,
        ],
    ))
}

pub fn email_recognizer() -> Result<PatternRecognizer, PromptError> {
    Ok(PatternRecognizer::new(
        "email_recognizer",
        EMAIL_ADDRESS,
        vec![Pattern::new(
            "email",
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            1.0,
        )?],
    ))
}

/// Detects known terms (customer names, neighbourhoods, cities) as whole words,
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct TermRecognizer {
    name: String,
    inner: Option<PatternRecognizer>,
}

impl TermRecognizer {
    pub fn new<I, S>(name: &str, entity: &str, terms: I, score: f64) -> Result<Self, PromptError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| t.chars().count() > 3)
            .collect();
        // Longest first so that "Andheri West" is preferred over "Andheri".
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        let inner = if terms.is_empty() {
            None
        } else {
            let alternation = terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Pattern::new(name, &format!(r"(?i)\b(?:{alternation})\b"), score)?;
            Some(PatternRecognizer::new(name, entity, vec![pattern]))
        };

        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }

    /// Customer names from the profile data, tagged as `PERSON`.
    pub fn people<I, S>(names: I) -> Result<Self, PromptError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("known_person_recognizer", PERSON, names, 0.85)
    }

    /// Place names from store addresses, tagged as `LOCATION`.
    pub fn places<I, S>(places: I) -> Result<Self, PromptError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("known_location_recognizer", LOCATION, places, 0.85)
    }
}

#[async_trait]
impl Recognizer for TermRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        text: &str,
        entities: &[String],
        language: &str,
    ) -> Result<Vec<RecognizerResult>, PromptError> {
        match &self.inner {
            Some(inner) => inner.analyze(text, entities, language).await,
            None => Ok(Vec::new()),
        }
    }
}
