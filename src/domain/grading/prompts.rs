//! Prompt templates and reply parsing for model-backed graders
//!
//! Templates use `${name}` placeholders filled by [`render`].

use serde::Deserialize;

/// System prompt for chunk relevance grading
pub const RELEVANCE_SYSTEM: &str = r#"You are a grader assessing relevance of a retrieved document to a user question.
If the document contains keyword(s) or semantic meaning related to the user question, grade it as relevant.
Give a binary score 'yes' or 'no' to indicate whether the document is relevant to the question.
Respond with a JSON object: {"score": "yes" | "no", "reason": "<one short sentence>"}"#;

/// Variables: `${document}`, `${question}`
pub const RELEVANCE_USER: &str = "Retrieved document: \n\n ${document} \n\n User question: ${question}";

/// Variables: `${question}`, `${context}`
pub const GENERATION_PROMPT: &str = "You are an assistant for question-answering tasks. Use the following pieces of retrieved context to answer the question. If you don't know the answer, just say that you don't know. Use three sentences maximum and keep the answer concise.\nQuestion: ${question} \nContext: ${context} \nAnswer:";

/// System prompt for groundedness grading
pub const GROUNDEDNESS_SYSTEM: &str = r#"You are a grader assessing whether an LLM generation is grounded in / supported by a set of retrieved facts.
Judge only against the facts given, not against outside knowledge.
Give a binary score 'yes' or 'no'. 'Yes' means the answer is grounded in and supported by the set of facts.
Respond with a JSON object: {"score": "yes" | "no", "reason": "<one short sentence>"}"#;

/// Variables: `${documents}`, `${generation}`
pub const GROUNDEDNESS_USER: &str = "Set of facts: \n\n ${documents} \n\n LLM generation: ${generation}";

/// System prompt for answer relevance grading
pub const ANSWER_RELEVANCE_SYSTEM: &str = r#"You are a grader assessing whether an answer addresses / resolves a question.
Give a binary score 'yes' or 'no'. 'Yes' means the answer resolves the question.
Respond with a JSON object: {"score": "yes" | "no", "reason": "<one short sentence>"}"#;

/// Variables: `${question}`, `${generation}`
pub const ANSWER_RELEVANCE_USER: &str = "User question: \n\n ${question} \n\n LLM generation: ${generation}";

/// System prompt for query rewriting
pub const REWRITE_SYSTEM: &str = "You are a question re-writer that converts an input question to a better version that is optimized for vectorstore retrieval. Look at the input and try to reason about the underlying semantic intent / meaning. Reply with the improved question only.";

/// Variables: `${question}`, `${reason}`, `${attempt}`
pub const REWRITE_USER: &str = "Here is the initial question: \n\n ${question} \n\n This is rewrite attempt ${attempt}; ${reason}. Formulate an improved question that differs from the initial one.";

/// Fill `${name}` placeholders
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("${{{}}}", name), value)
    })
}

/// Parsed yes/no judgement from a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryScore {
    pub yes: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScoreReply {
    #[serde(alias = "binary_score")]
    score: serde_json::Value,
    #[serde(default, alias = "rationale")]
    reason: Option<String>,
}

/// Extract a JSON object from a string (handles markdown code fences and prose)
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    (start < end).then(|| &text[start..=end])
}

/// Parse a yes/no reply
///
/// A JSON `{"score": "yes"}` object wins; otherwise any standalone `yes` word counts.
pub fn parse_binary_score(reply: &str) -> BinaryScore {
    let parsed = extract_json(reply).and_then(|json| serde_json::from_str::<ScoreReply>(json).ok());

    if let Some(parsed) = parsed {
        let yes = match parsed.score {
            serde_json::Value::String(s) => s.trim().eq_ignore_ascii_case("yes"),
            serde_json::Value::Bool(b) => b,
            _ => false,
        };
        return BinaryScore {
            yes,
            reason: parsed.reason.filter(|r| !r.trim().is_empty()),
        };
    }

    let yes = reply
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("yes"));

    BinaryScore { yes, reason: None }
}

/// Strip surrounding quotes, whitespace, and a leading label from a rewritten question
pub fn clean_rewrite(reply: &str) -> String {
    let strip = |s: &str| -> String {
        s.trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
            .to_string()
    };

    let mut text = strip(reply);

    for label in ["Improved question:", "Rewritten question:", "Question:"] {
        let labelled = text
            .get(..label.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(label));
        if labelled {
            text = strip(&text[label.len()..]);
        }
    }

    text
}
