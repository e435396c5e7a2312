/// Splits on whitespace, commas and slashes, lower-cased, empties dropped.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == '/')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Cheap local signal: does any job-description token appear in the resume's stated position?
/// OR'd with the provider's own `positionMatch` when the result record is assembled.
pub fn check_position_match(resume_position: &str, job_description: &str) -> bool {
    if resume_position.trim().is_empty() || job_description.trim().is_empty() {
        return false;
    }

    let resume_tokens: Vec<String> = tokens(resume_position).collect();
    tokens(job_description).any(|t| resume_tokens.contains(&t))
}
