use common::{error::AppError, llm::LlmClient};
use serde::Deserialize;
use serde_json::json;

pub static JUDGE_SYSTEM_MESSAGE: &str = "You grade whether a retrieval result satisfies an \
expected outcome description. Be strict: the retrieved content must actually support the \
claim, not merely mention related words.";

#[derive(Debug, Deserialize)]
pub struct JudgeVerdict {
    pub pass: bool,
    pub reason: String,
}

fn judge_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "pass": { "type": "boolean" },
            "reason": { "type": "string" }
        },
        "required": ["pass", "reason"],
        "additionalProperties": false
    })
}

/// Scores one recall result against its expected outcome, LLM-as-judge.
pub async fn judge(
    llm: &LlmClient,
    query: &str,
    expected_outcome: &str,
    observed: &str,
) -> Result<JudgeVerdict, AppError> {
    let user_message = format!(
        "Query: {query}\nExpected outcome: {expected_outcome}\nObserved retrieval output:\n{observed}"
    );
    let raw = llm
        .complete_json(
            "judge_verdict",
            "Pass/fail verdict for a retrieval outcome",
            judge_schema(),
            JUDGE_SYSTEM_MESSAGE,
            &user_message,
        )
        .await?;
    serde_json::from_str(&raw).map_err(|e| AppError::LlmParsing(e.to_string()))
}
