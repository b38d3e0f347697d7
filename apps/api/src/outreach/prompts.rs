// Prompt constants for outreach message composition.

/// System prompt for composing an application email.
pub const COMPOSE_SYSTEM: &str = "You are a concise, professional career assistant \
    writing job application emails on behalf of a candidate. \
    Never invent experience, employers, or skills the candidate did not list.";

/// Composition prompt. Replace every `{placeholder}` before sending.
pub const COMPOSE_PROMPT_TEMPLATE: &str = r#"Write a professional job application email.

Candidate Name: {candidate_name}
Candidate Skills: {candidate_skills}
Candidate Experience: {candidate_experience} years

Target Role: {job_title}
Company: {company}
Job Reference/Link: {job_link}

Task:
1. Match the candidate's skills to the job role.
2. Keep it concise (max 150 words).
3. Mention that the resume is attached.
4. Include the Job Reference/Link in the body.

Return a JSON object with exactly these keys:
{"subject": "string", "body": "string"}"#;
