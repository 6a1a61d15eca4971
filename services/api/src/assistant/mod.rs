//! services/api/src/assistant/mod.rs
//!
//! The AI operations offered to the dashboard and used by the autoresponder.
//! Each one is a prompt template plus a parse step on top of `CompletionService`.
//! Parsing never fails on malformed model output; it degrades to a best-effort
//! structured value instead.

pub mod prompts;

use outreach_core::domain::{Faq, Sentiment};
use outreach_core::phone;
use outreach_core::ports::{CompletionService, PortError, PortResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

const CSV_FALLBACK_SUGGESTION: &str =
    "Please review the AI analysis above for specific recommendations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvAnalysis {
    pub analysis: String,
    pub suggestions: Vec<String>,
    pub transformed_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub explanation: Option<String>,
}

/// A cleaned phone number and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPhone {
    pub phone: String,
    pub ai_assisted: bool,
}

pub struct Assistant {
    llm: Arc<dyn CompletionService>,
}

impl Assistant {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    pub async fn rewrite_tone(&self, message: &str, tone: &str) -> PortResult<String> {
        self.llm.complete(&prompts::tone(message, tone), None).await
    }

    pub async fn standardize_name(&self, name: &str) -> PortResult<String> {
        let raw = self.llm.complete(&prompts::standardize_name(name), None).await?;
        Ok(strip_quotes(&raw))
    }

    pub async fn suggest_title(&self, name: &str, context: &str) -> PortResult<String> {
        let raw = self
            .llm
            .complete(&prompts::suggest_title(name, context), None)
            .await?;
        Ok(strip_quotes(&raw))
    }

    /// Cleans locally, then lets the model confirm. Any model failure, or an
    /// answer that is not a plain digit string, keeps the local result.
    pub async fn clean_phone(&self, raw: &str) -> PortResult<CleanedPhone> {
        let local = phone::clean_locally(raw);
        if local.is_empty() {
            return Err(PortError::InvalidInput(format!(
                "'{}' contains no digits",
                raw
            )));
        }

        match self.llm.complete(&prompts::clean_phone(&local), None).await {
            Ok(answer) => {
                let answer = strip_quotes(&answer);
                if !answer.is_empty() && answer.chars().all(|c| c.is_ascii_digit()) {
                    Ok(CleanedPhone {
                        phone: answer,
                        ai_assisted: true,
                    })
                } else {
                    debug!("Discarding non-numeric phone answer '{}'", answer);
                    Ok(CleanedPhone {
                        phone: local,
                        ai_assisted: false,
                    })
                }
            }
            Err(e) => {
                warn!("AI phone cleaning failed, using local result: {}", e);
                Ok(CleanedPhone {
                    phone: local,
                    ai_assisted: false,
                })
            }
        }
    }

    pub async fn analyze_csv(
        &self,
        headers: &[String],
        rows: &[Map<String, Value>],
        user_prompt: &str,
    ) -> PortResult<CsvAnalysis> {
        let raw = self
            .llm
            .complete(&prompts::process_csv(headers, rows, user_prompt), None)
            .await?;
        Ok(parse_csv_analysis(&raw))
    }

    pub async fn analyze_sentiment(&self, message: &str) -> PortResult<SentimentAnalysis> {
        let raw = self.llm.complete(&prompts::sentiment(message), None).await?;
        Ok(parse_sentiment(&raw))
    }

    pub async fn generate_autoreply(
        &self,
        user_message: &str,
        faq: &Faq,
        contact_name: Option<&str>,
        company_info: Option<&str>,
    ) -> PortResult<String> {
        let prompt = prompts::autoreply(user_message, faq, contact_name, company_info);
        self.llm.complete(&prompt, None).await
    }
}

//=========================================================================================
// Response parsing
//=========================================================================================

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"))
}

/// The outermost `{...}` span of a free-text answer, parsed.
fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    let found = json_object_pattern().find(raw)?;
    match serde_json::from_str::<Value>(found.as_str()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn strip_quotes(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

pub fn parse_csv_analysis(raw: &str) -> CsvAnalysis {
    let fallback = || CsvAnalysis {
        analysis: strip_code_fences(raw),
        suggestions: vec![CSV_FALLBACK_SUGGESTION.to_string()],
        transformed_data: None,
    };

    let Some(map) = extract_json_object(raw) else {
        return fallback();
    };

    let analysis = match map.get("analysis") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return fallback(),
    };
    let suggestions = match map.get("suggestions") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    };
    let transformed_data = map
        .get("transformedData")
        .filter(|value| !value.is_null())
        .cloned();

    CsvAnalysis {
        analysis,
        suggestions,
        transformed_data,
    }
}

pub fn parse_sentiment(raw: &str) -> SentimentAnalysis {
    if let Some(map) = extract_json_object(raw) {
        if let Some(label) = map.get("sentiment").and_then(Value::as_str) {
            let confidence = map
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.5)
                .clamp(0.0, 1.0);
            let explanation = map
                .get("explanation")
                .and_then(Value::as_str)
                .map(str::to_string);
            return SentimentAnalysis {
                sentiment: Sentiment::parse_lenient(label),
                confidence,
                explanation,
            };
        }
    }

    // Free text: look for the label itself.
    let lowered = raw.to_lowercase();
    let sentiment = if lowered.contains("positive") {
        Sentiment::Positive
    } else if lowered.contains("negative") {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };
    SentimentAnalysis {
        sentiment,
        confidence: 0.5,
        explanation: Some(raw.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedLlm {
        answer: PortResult<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn answering(answer: PortResult<String>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedLlm {
        async fn complete(&self, prompt: &str, _model: Option<&str>) -> PortResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(PortError::Upstream("boom".to_string())),
            }
        }
    }

    #[test]
    fn csv_json_embedded_in_prose_is_extracted() {
        let raw = "Sure! Here it is:\n```json\n{\"analysis\": \"Phones have plus signs\", \"suggestions\": [\"Strip +\"], \"transformedData\": [{\"name\": \"A\"}]}\n```";
        let parsed = parse_csv_analysis(raw);
        assert_eq!(parsed.analysis, "Phones have plus signs");
        assert_eq!(parsed.suggestions, vec!["Strip +".to_string()]);
        assert!(parsed.transformed_data.unwrap().is_array());
    }

    #[test]
    fn csv_free_text_degrades_to_analysis() {
        let parsed = parse_csv_analysis("```json\nThe data looks fine.\n```");
        assert_eq!(parsed.analysis, "The data looks fine.");
        assert_eq!(parsed.suggestions, vec![CSV_FALLBACK_SUGGESTION.to_string()]);
        assert_eq!(parsed.transformed_data, None);
    }

    #[test]
    fn sentiment_json_is_parsed_and_clamped() {
        let parsed =
            parse_sentiment(r#"{"sentiment": "Positive", "confidence": 1.7, "explanation": "keen"}"#);
        assert_eq!(parsed.sentiment, Sentiment::Positive);
        assert_eq!(parsed.confidence, 1.0);
        assert_eq!(parsed.explanation.as_deref(), Some("keen"));
    }

    #[test]
    fn sentiment_free_text_scans_for_label() {
        assert_eq!(
            parse_sentiment("This reads as negative overall").sentiment,
            Sentiment::Negative
        );
        assert_eq!(parse_sentiment("hard to say").sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn clean_phone_falls_back_to_local_result() {
        let llm = ScriptedLlm::answering(Err(PortError::Upstream(String::new())));
        let assistant = Assistant::new(llm);
        let cleaned = assistant.clean_phone("0798 149 980").await.unwrap();
        assert_eq!(
            cleaned,
            CleanedPhone {
                phone: "254798149980".to_string(),
                ai_assisted: false
            }
        );
    }

    #[tokio::test]
    async fn clean_phone_sends_the_locally_cleaned_number() {
        let llm = ScriptedLlm::answering(Ok("\"254798149980\"".to_string()));
        let assistant = Assistant::new(llm.clone());
        let cleaned = assistant.clean_phone("+254 798-149-980").await.unwrap();
        assert!(cleaned.ai_assisted);
        assert_eq!(cleaned.phone, "254798149980");
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Phone number to clean: \"254798149980\""));
    }

    #[tokio::test]
    async fn clean_phone_rejects_input_without_digits() {
        let assistant = Assistant::new(ScriptedLlm::answering(Ok("1".to_string())));
        let err = assistant.clean_phone("n/a").await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }
}
