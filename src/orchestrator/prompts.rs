//! Prompt builders for the built-in operations.

use crate::types::Message;

const RESUME_SYSTEM: &str = "You are an expert resume writer. Write a concise, \
achievement-focused resume in Markdown from the candidate profile. Do not invent \
employers, dates or qualifications.";

const COVER_LETTER_SYSTEM: &str = "You are an expert career coach. Write a tailored, \
professional cover letter of at most four paragraphs. Return only the letter text.";

const ATS_SYSTEM: &str = "You are an applicant tracking system. Compare the resume \
with the job description and respond with JSON only, in the shape \
{\"score\": <integer 0-100>, \"matched_keywords\": [string], \
\"missing_keywords\": [string], \"suggestions\": [string]}.";

const JOB_EXTRACTION_SYSTEM: &str = "Extract the structured job posting from the text \
and respond with JSON only, in the shape {\"title\": string, \"company\": string|null, \
\"location\": string|null, \"requirements\": [string], \"responsibilities\": [string], \
\"skills\": [string]}.";

const SKILL_GAP_SYSTEM: &str = "Compare the candidate's skills with those the job \
requires and respond with JSON only, in the shape {\"matching_skills\": [string], \
\"missing_skills\": [string], \"recommendations\": [string]}.";

pub fn resume(profile: &str, job_description: Option<&str>) -> Vec<Message> {
    let mut user = format!("Candidate profile:\n{profile}");
    if let Some(job) = job_description {
        user.push_str(&format!("\n\nTailor the resume to this job:\n{job}"));
    }
    vec![Message::system(RESUME_SYSTEM), Message::user(user)]
}

pub fn cover_letter(profile: &str, job_description: &str, company: Option<&str>) -> Vec<Message> {
    let mut user = format!("Candidate profile:\n{profile}\n\nJob description:\n{job_description}");
    if let Some(company) = company {
        user.push_str(&format!("\n\nThe letter is addressed to {company}."));
    }
    vec![Message::system(COVER_LETTER_SYSTEM), Message::user(user)]
}

pub fn ats_score(resume: &str, job_description: &str) -> Vec<Message> {
    vec![
        Message::system(ATS_SYSTEM),
        Message::user(format!(
            "Resume:\n{resume}\n\nJob description:\n{job_description}"
        )),
    ]
}

pub fn job_extraction(text: &str) -> Vec<Message> {
    vec![
        Message::system(JOB_EXTRACTION_SYSTEM),
        Message::user(format!("Job posting:\n{text}")),
    ]
}

pub fn skill_gap(resume: &str, job_description: &str) -> Vec<Message> {
    vec![
        Message::system(SKILL_GAP_SYSTEM),
        Message::user(format!(
            "Resume:\n{resume}\n\nJob description:\n{job_description}"
        )),
    ]
}
