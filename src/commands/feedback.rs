use std::env;
use std::fs;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::cli::FeedbackArgs;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SYSTEM_INSTRUCTION: &str = "You are an expert QA Analyst. Analyze the following QA case summary and provide constructive feedback. The feedback should include an overall analysis, specific suggestions for improvement with examples, and highlight both strengths and weaknesses. Format the response as HTML content with headings, paragraphs, and lists.

Example response format:
<h3 class=\"text-lg font-semibold mb-2\">Analysis of QA Case</h3>
<p class=\"mb-2\">Overall summary of the interaction.</p>
<h4 class=\"font-semibold mt-4 mb-2\">Strengths:</h4>
<ul class=\"list-disc list-inside space-y-1\">
    <li>Strength 1.</li>
    <li>Strength 2.</li>
</ul>
<h4 class=\"font-semibold mt-4 mb-2\">Suggestions for Improvement:</h4>
<ul class=\"list-disc list-inside space-y-1\">
    <li>Suggestion 1 with details.</li>
    <li>Suggestion 2 with details.</li>
</ul>";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub fn run(args: FeedbackArgs) -> Result<()> {
    let case = resolve_case(&args)?;
    let api_key = env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;

    info!(model = %args.model, chars = case.len(), "requesting narrative feedback");
    let narrative = generate_feedback(&args.model, &api_key, &case)?;
    println!("{narrative}");

    Ok(())
}

fn resolve_case(args: &FeedbackArgs) -> Result<String> {
    let case = match (&args.case, &args.case_file) {
        (Some(_), Some(_)) => bail!("pass either --case or --case-file, not both"),
        (Some(text), None) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("a QA case summary is required: pass --case or --case-file"),
    };

    let trimmed = case.trim();
    if trimmed.is_empty() {
        bail!("QA case summary is empty");
    }
    Ok(trimmed.to_string())
}

/// One request, one response. Errors from the service are surfaced verbatim;
/// there is no retry.
fn generate_feedback(model: &str, api_key: &str, case: &str) -> Result<String> {
    let url = format!("{API_BASE}/{model}:generateContent");
    let payload = json!({
        "system_instruction": { "parts": [ { "text": SYSTEM_INSTRUCTION } ] },
        "contents": [ { "role": "user", "parts": [ { "text": case } ] } ],
    });

    let client = reqwest::blocking::Client::new();
    let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&payload)
        .send()
        .context("feedback request failed")?;

    let status = response.status();
    let body = response
        .text()
        .context("failed to read feedback response")?;
    if !status.is_success() {
        bail!("feedback service returned {status}: {body}");
    }

    let parsed: GenerateContentResponse =
        serde_json::from_str(&body).context("failed to decode feedback response")?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .context("feedback response contained no candidates")?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        bail!("feedback response contained no text");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback_args(case: Option<&str>) -> FeedbackArgs {
        FeedbackArgs {
            case: case.map(ToOwned::to_owned),
            case_file: None,
            model: "gemini-2.5-flash".to_string(),
        }
    }

    #[test]
    fn case_summary_is_required_and_nonempty() {
        assert!(resolve_case(&feedback_args(None)).is_err());
        assert!(resolve_case(&feedback_args(Some("   "))).is_err());
        assert_eq!(
            resolve_case(&feedback_args(Some("  missed link checks  "))).expect("case"),
            "missed link checks"
        );
    }

    #[test]
    fn inline_case_and_file_are_mutually_exclusive() {
        let mut args = feedback_args(Some("text"));
        args.case_file = Some("case.txt".into());
        assert!(resolve_case(&args).is_err());
    }

    #[test]
    fn response_text_concatenates_first_candidate_parts() {
        let body = r#"{
            "candidates": [
                { "content": { "parts": [ { "text": "<h3>Analysis</h3>" }, { "text": "<p>ok</p>" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).expect("parse");
        let first = parsed.candidates.into_iter().next().expect("candidate");
        let text: String = first
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        assert_eq!(text, "<h3>Analysis</h3><p>ok</p>");
    }
}
