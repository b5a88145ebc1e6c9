use crate::models::resume::JobContext;

/// System prompt: JSON-only output in the feedback schema.
pub const FEEDBACK_SYSTEM: &str = "You are an expert in ATS (Applicant Tracking System) \
    and résumé analysis. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

pub const FEEDBACK_SCHEMA: &str = r#"{
  "overallScore": number (0-100),
  "ATS": { "score": number (0-100), "tips": [{ "type": "good" | "improve", "tip": string }] },
  "toneAndStyle": { "score": number, "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }] },
  "content": { "score": number, "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }] },
  "structure": { "score": number, "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }] },
  "skills": { "score": number, "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }] }
}"#;

pub const FEEDBACK_PROMPT_TEMPLATE: &str = "\
Analyze and rate this résumé and suggest how to improve it.
Be thorough and detailed. Don't be afraid to point out mistakes or areas for improvement.
If there is a lot to improve, don't hesitate to give low scores.
If available, use the job description to tailor the feedback.

Job title: {job_title}
Company: {company_name}
Job description:
{job_description}

Provide 3-4 tips per category.
Return the analysis as a JSON object in exactly this format:
{schema}

Résumé text:
{resume_text}";

pub fn build_feedback_prompt(resume_text: &str, job: &JobContext) -> String {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("Not provided")
            .to_string()
    };

    FEEDBACK_PROMPT_TEMPLATE
        .replace("{job_title}", &field(&job.job_title))
        .replace("{company_name}", &field(&job.company_name))
        .replace("{job_description}", &field(&job.job_description))
        .replace("{schema}", FEEDBACK_SCHEMA)
        .replace("{resume_text}", resume_text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_questionnaire_answers() {
        let job = JobContext {
            company_name: Some("Acme".into()),
            job_title: Some("Backend Engineer".into()),
            job_description: None,
        };
        let prompt = build_feedback_prompt("  Jane Doe, Rust developer  ", &job);
        assert!(prompt.contains("Job title: Backend Engineer"));
        assert!(prompt.contains("Company: Acme"));
        assert!(prompt.contains("Job description:\nNot provided"));
        assert!(prompt.contains("\"overallScore\""));
        assert!(prompt.ends_with("Jane Doe, Rust developer"));
    }

    #[test]
    fn test_blank_answers_are_not_provided() {
        let job = JobContext {
            company_name: Some("   ".into()),
            ..JobContext::default()
        };
        let prompt = build_feedback_prompt("text", &job);
        assert!(prompt.contains("Company: Not provided"));
    }
}
