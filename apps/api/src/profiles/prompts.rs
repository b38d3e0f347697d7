// Prompt constants for resume structuring.

/// Extraction prompt. Replace `{resume_text}` before sending.
pub const RESUME_EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract the following information from the resume text below:
1. Skills (as a list of strings)
2. Professional Experience (number of years in total, as an integer)

Return a JSON object with exactly these keys:
{"skills": ["string"], "experience": 0}

If the resume does not state any experience, use null for "experience".

Resume Text:
{resume_text}"#;
