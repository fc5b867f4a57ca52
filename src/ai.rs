//! AI gateway: verse lookup and exercise generation through a hosted language model.
//!
//! Every request carries a prompt and a JSON response schema. The model's reply
//! is parsed and validated here; nothing reaches the UI unvalidated.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;
use crate::models::{Item, ItemDraft};

/// Placeholder for a removed word in a fill-in-the-blank exercise.
pub const EXERCISE_BLANK: &str = "____";
/// Placeholder for a removed word in a word-bank quiz.
pub const QUIZ_BLANK: &str = "__BLANK__";
/// Largest word bank that can be answered from the number keys.
pub const MAX_CHOICES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("No API key configured. Add your Gemini API key in settings.")]
    MissingApiKey,
    #[error("No passage found for \"{reference}\". Check the reference and try again.")]
    NotFound { reference: String },
    #[error("The AI returned an unusable response ({0}). Please try again.")]
    Malformed(String),
    #[error("Request failed ({0}). Check your API key and network connection.")]
    Request(String),
}

/// Credential handed explicitly to each gateway call.
#[derive(Debug, Clone, Default)]
pub struct AiContext {
    api_key: String,
}

impl AiContext {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn key(&self) -> Result<&str, AiError> {
        if self.has_key() {
            Ok(self.api_key.trim())
        } else {
            Err(AiError::MissingApiKey)
        }
    }
}

/// Fill-in-the-blank exercise with a word bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillInBlanks {
    #[serde(alias = "verseWithBlanks")]
    pub text_with_blanks: String,
    pub correct_words: Vec<String>,
    pub all_choices: Vec<String>,
}

/// Multiple-choice quiz: fill each `__BLANK__` from answers plus distractors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub quiz_text: String,
    pub answers: Vec<String>,
    pub distractors: Vec<String>,
}

/// Something that can look up passages and write exercises.
pub trait ExerciseSource: Send + Sync {
    fn lookup_verses(&self, ctx: &AiContext, reference: &str) -> Result<Vec<ItemDraft>, AiError>;

    fn generate_exercise(&self, ctx: &AiContext, text: &str) -> Result<FillInBlanks, AiError>;

    fn generate_quiz(&self, ctx: &AiContext, item: &Item, exclude: &[String]) -> Result<Quiz, AiError>;
}

// ══════════════════════════════════════════════════════════════════════════
// Gemini client
// ══════════════════════════════════════════════════════════════════════════

pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_base: String,
    model: String,
    translation: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            translation: config.translation.clone(),
        }
    }

    fn generate(&self, ctx: &AiContext, prompt: String, schema: Value) -> Result<String, AiError> {
        let key = ctx.key()?;
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        log::info!("Requesting {} from {}", self.model, self.api_base);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .map_err(|e| {
                log::warn!("AI request failed: {}", e);
                AiError::Request(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            log::warn!("AI request returned {}: {}", status, detail);
            return Err(AiError::Request(format!("HTTP {}", status.as_u16())));
        }

        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| AiError::Malformed(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AiError::Malformed("empty response".into()));
        }
        Ok(text)
    }
}

impl ExerciseSource for GeminiClient {
    fn lookup_verses(&self, ctx: &AiContext, reference: &str) -> Result<Vec<ItemDraft>, AiError> {
        let prompt = format!(
            "Find the Bible passage \"{reference}\" in the {translation}. \
             If the reference is a range (for example Genesis 1:1-5), return every verse in the \
             range as its own entry. A single verse is returned as an array with one entry. \
             Each entry has 'reference' (the canonical reference in the translation's language, \
             for example '창세기 1:1') and 'text' (the verse text). Add no other commentary. \
             If no valid passage exists, return an empty array.",
            translation = self.translation,
        );
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "reference": { "type": "STRING" },
                    "text": { "type": "STRING" },
                },
                "required": ["reference", "text"],
            },
        });

        let raw = self.generate(ctx, prompt, schema)?;
        parse_verses(reference, &raw)
    }

    fn generate_exercise(&self, ctx: &AiContext, text: &str) -> Result<FillInBlanks, AiError> {
        let prompt = format!(
            "Build a fill-in-the-blank exercise from this passage: \"{text}\".\n\
             1. Remove 3 to 5 theologically important words. Keep each word together with any \
             particle or ending attached to it; never split a particle from its word.\n\
             2. Replace each removed word with '{EXERCISE_BLANK}' in 'textWithBlanks'.\n\
             3. List the removed words in order in 'correctWords'.\n\
             4. Invent 3 plausible but wrong distractor words that are not simple variants of \
             the answers.\n\
             5. 'allChoices' holds the correct words and distractors, shuffled."
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "textWithBlanks": { "type": "STRING" },
                "correctWords": { "type": "ARRAY", "items": { "type": "STRING" } },
                "allChoices": { "type": "ARRAY", "items": { "type": "STRING" } },
            },
            "required": ["textWithBlanks", "correctWords", "allChoices"],
        });

        let raw = self.generate(ctx, prompt, schema)?;
        parse_exercise(&raw)
    }

    fn generate_quiz(&self, ctx: &AiContext, item: &Item, exclude: &[String]) -> Result<Quiz, AiError> {
        let avoid = if exclude.is_empty() {
            String::new()
        } else {
            format!(
                " Do not blank out any of these words, which were used last time: {}.",
                exclude.join(", ")
            )
        };
        let prompt = format!(
            "Make a word-bank quiz for memorizing {reference}: \"{text}\".\n\
             Replace 3 to 5 key words with '{QUIZ_BLANK}' in 'quizText', keeping line breaks. \
             Put the removed words, in order, in 'answers'. Add 3 plausible wrong words in \
             'distractors'.{avoid}",
            reference = item.reference,
            text = item.text,
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "quizText": { "type": "STRING" },
                "answers": { "type": "ARRAY", "items": { "type": "STRING" } },
                "distractors": { "type": "ARRAY", "items": { "type": "STRING" } },
            },
            "required": ["quizText", "answers", "distractors"],
        });

        let raw = self.generate(ctx, prompt, schema)?;
        parse_quiz(&raw, exclude)
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Response validation
// ══════════════════════════════════════════════════════════════════════════

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

pub fn parse_verses(reference: &str, raw: &str) -> Result<Vec<ItemDraft>, AiError> {
    let drafts: Vec<ItemDraft> = serde_json::from_str(strip_fences(raw))
        .map_err(|e| AiError::Malformed(e.to_string()))?;

    let drafts: Vec<ItemDraft> = drafts
        .into_iter()
        .map(|d| ItemDraft::new(d.reference.trim(), d.text.trim()))
        .filter(|d| !d.reference.is_empty() && !d.text.is_empty())
        .collect();

    if drafts.is_empty() {
        return Err(AiError::NotFound {
            reference: reference.to_string(),
        });
    }
    Ok(drafts)
}

pub fn parse_exercise(raw: &str) -> Result<FillInBlanks, AiError> {
    let mut exercise: FillInBlanks = serde_json::from_str(strip_fences(raw))
        .map_err(|e| AiError::Malformed(e.to_string()))?;

    let blanks = exercise.text_with_blanks.matches(EXERCISE_BLANK).count();
    if blanks == 0 || exercise.correct_words.is_empty() {
        return Err(AiError::Malformed("no blanks".into()));
    }
    if blanks != exercise.correct_words.len() {
        return Err(AiError::Malformed(format!(
            "{} blanks but {} answers",
            blanks,
            exercise.correct_words.len()
        )));
    }

    if exercise.correct_words.len() > MAX_CHOICES {
        return Err(AiError::Malformed(format!("{} blanks", blanks)));
    }

    // Every answer must be pickable from the bank, counting repeats. Extra
    // distractors are dropped so the bank fits the number keys.
    let mut needed = exercise.correct_words.clone();
    let mut spare = MAX_CHOICES - needed.len();
    let mut bank = Vec::with_capacity(MAX_CHOICES);
    for choice in exercise.all_choices.drain(..) {
        if let Some(pos) = needed.iter().position(|w| *w == choice) {
            needed.swap_remove(pos);
            bank.push(choice);
        } else if spare > 0 {
            spare -= 1;
            bank.push(choice);
        }
    }
    bank.extend(needed);
    exercise.all_choices = bank;
    Ok(exercise)
}

pub fn parse_quiz(raw: &str, exclude: &[String]) -> Result<Quiz, AiError> {
    let mut quiz: Quiz = serde_json::from_str(strip_fences(raw))
        .map_err(|e| AiError::Malformed(e.to_string()))?;

    let blanks = quiz.quiz_text.matches(QUIZ_BLANK).count();
    if blanks == 0 || blanks != quiz.answers.len() {
        return Err(AiError::Malformed(format!(
            "{} blanks but {} answers",
            blanks,
            quiz.answers.len()
        )));
    }
    if quiz.answers.iter().any(|a| a.trim().is_empty()) {
        return Err(AiError::Malformed("empty answer".into()));
    }
    if quiz.answers.len() > MAX_CHOICES {
        return Err(AiError::Malformed(format!("{} blanks", blanks)));
    }
    // Short texts may have nothing left to blank out.
    if let Some(reused) = quiz.answers.iter().find(|a| exclude.contains(a)) {
        log::info!("Quiz reuses previous answer '{}'", reused);
    }
    quiz.distractors.truncate(MAX_CHOICES - quiz.answers.len());
    Ok(quiz)
}

// ══════════════════════════════════════════════════════════════════════════
// Background requests
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum AiRequest {
    Lookup(String),
    Exercise(String),
    Quiz { item: Item, exclude: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AiReply {
    Verses(Vec<ItemDraft>),
    Exercise(FillInBlanks),
    Quiz(Quiz),
}

/// Run a request on a worker thread.
///
/// Dropping the receiver abandons the request: the worker finishes but its
/// result goes nowhere.
pub fn spawn_request(
    source: Arc<dyn ExerciseSource>,
    ctx: AiContext,
    request: AiRequest,
) -> Receiver<Result<AiReply, AiError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let reply = match request {
            AiRequest::Lookup(reference) => source
                .lookup_verses(&ctx, &reference)
                .map(AiReply::Verses),
            AiRequest::Exercise(text) => source
                .generate_exercise(&ctx, &text)
                .map(AiReply::Exercise),
            AiRequest::Quiz { item, exclude } => source
                .generate_quiz(&ctx, &item, &exclude)
                .map(AiReply::Quiz),
        };
        if let Err(ref e) = reply {
            log::warn!("AI request failed: {}", e);
        }
        let _ = tx.send(reply);
    });
    rx
}
