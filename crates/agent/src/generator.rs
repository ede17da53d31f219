//! Candidate SQL generation from a routed question.

use std::sync::Arc;

use tabula_core::cost::estimate_cost_usd;
use tabula_core::domain::CostInfo;
use tabula_core::router::Intent;
use tabula_core::sql::extract_sql_from_response;
use tabula_core::workflow::QueryCandidate;

use crate::llm::{LlmClient, LlmError};
use crate::prompts::{sql_user_prompt, SQL_SYSTEM_PROMPT};

pub struct SqlGenerator {
    llm: Arc<dyn LlmClient>,
    allowed_tables: Vec<String>,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, allowed_tables: Vec<String>) -> Self {
        Self { llm, allowed_tables }
    }

    /// Asks the model for one candidate query. `denial_feedback` carries
    /// the previous rejection detail so a retry can correct course.
    pub async fn generate(
        &self,
        question: &str,
        intent: Intent,
        denial_feedback: Option<&str>,
    ) -> Result<(QueryCandidate, CostInfo), LlmError> {
        let user = sql_user_prompt(question, &self.allowed_tables, denial_feedback);
        let completion = self.llm.complete(SQL_SYSTEM_PROMPT, &user).await?;

        let sql = extract_sql_from_response(&completion.text);
        if sql.is_empty() {
            return Err(LlmError::MalformedResponse(
                "completion contained no SQL statement".to_string(),
            ));
        }

        let model_name = self.llm.model_name().to_string();
        let cost = CostInfo {
            estimated_cost_usd: estimate_cost_usd(
                &model_name,
                completion.prompt_tokens,
                completion.completion_tokens,
            ),
            model_name,
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
            total_tokens: completion.prompt_tokens + completion.completion_tokens,
        };

        Ok((QueryCandidate { text: sql, source_intent: intent }, cost))
    }
}
