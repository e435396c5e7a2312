// Prompt templates shared by every provider adapter.
// `{name}` placeholders are filled in a single pass before sending.

/// Structured resume extraction. Replace `{resume_text}`.
pub const RESUME_PARSE_PROMPT: &str = r#"You are an AI resume parser. Analyze this resume text and extract:
1. Full name
2. Email address
3. Phone number
4. Post applied for (look for job title, desired position, or career objective)
5. Highest education qualification only (pick the most recent or highest degree)
6. Work experience (including company, position, duration, and key responsibilities)

Format work experience durations consistently:
- A specific duration: "X years Y months"
- An ongoing role: "Start Year - Present"
- Only years known: "X years"
- Only months known: "Y months"

For post applied for, prefer explicit mentions ("Applying for", "Position Sought",
"Career Objective"); otherwise infer from recent experience; otherwise "Not Specified".

For highest education, include exactly one entry using the order
PhD > Master's > Bachelor's > Diploma > Certificate.

Resume text:
"""
{resume_text}
"""

Return ONLY this JSON object, with no additional text or explanation:
{
  "fullName": "string",
  "email": "string",
  "phone": "string",
  "postAppliedFor": "string",
  "education": {
    "degree": "string",
    "institution": "string",
    "year": "string"
  },
  "experience": [
    {
      "company": "string",
      "position": "string",
      "duration": "string",
      "responsibilities": ["string"]
    }
  ]
}"#;

/// Resume vs position fit scoring. Replace `{job_description}` and `{resume_text}`.
pub const RESUME_SCORE_PROMPT: &str = r#"You are a resume evaluator. Analyze how well this resume matches the position
the candidate is applying for. Consider:
1. Position Match: is the resume clearly targeting the given position?
2. Relevant Experience: does it show related work history?
3. Education: appropriate degrees or certifications for the role
4. Skills: required technical and professional capabilities
5. Overall Alignment: general suitability for the position

Position Being Applied For: """{job_description}"""
Resume Content: """{resume_text}"""

Respond with strict JSON only:
{
  "aiScore": number (0-100),
  "positionMatch": boolean,
  "matchReasons": ["3-5 key reasons it's a good fit"],
  "mismatchReasons": ["3-5 key gaps if not matching"]
}

Rules:
1. Score position alignment, not general resume quality
2. Cite specific examples from the resume content
3. Focus on role-specific requirements
4. Never return empty arrays"#;

/// Cover letter generation. Replace `{resume_text}`, `{job_description}` and `{tone}`.
pub const COVER_LETTER_PROMPT: &str = r#"You are an AI cover letter writer.
Using this resume:
"""
{resume_text}
"""
And this job description:
"""
{job_description}
"""
Write a personalized cover letter in a {tone} tone. Highlight key strengths, keep it concise
and job-specific. Return only the letter content."#;

/// Fills `{name}` placeholders in one left-to-right pass. Substituted values are never
/// rescanned, so user text containing `{resume_text}` stays literal.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let hit = values.iter().find(|(name, _)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*name))
                .is_some_and(|t| t.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn resume_parse_prompt(resume_text: &str) -> String {
    fill(RESUME_PARSE_PROMPT, &[("resume_text", resume_text)])
}

pub fn resume_score_prompt(resume_text: &str, job_description: &str) -> String {
    fill(
        RESUME_SCORE_PROMPT,
        &[("job_description", job_description), ("resume_text", resume_text)],
    )
}

pub fn cover_letter_prompt(resume_text: &str, job_description: &str, tone: &str) -> String {
    fill(
        COVER_LETTER_PROMPT,
        &[
            ("resume_text", resume_text),
            ("job_description", job_description),
            ("tone", tone),
        ],
    )
}
