//! Common regex patterns for marksheet field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Bare number with optional percent sign, or a number after a "total" label
    pub static ref NUMERIC_TOKEN: Regex = Regex::new(
        r"(\d+(?:\.\d+)?)\s*%?|(?i:total)\s*[:\-]?\s*(\d+(?:\.\d+)?)"
    ).unwrap();

    // Labelled candidate name at the start of a line
    pub static ref NAME_LABEL: Regex = Regex::new(
        r"(?m)^\s*(?i:(?:candidate|student|examinee)'?s?\s+name|name\s+of\s+(?:the\s+)?(?:candidate|student|examinee)|name)\s*[:\-]\s*([A-Z][A-Za-z.'\-]*(?:[ \t]+[A-Z][A-Za-z.'\-]*){0,3})"
    ).unwrap();

    // Two to four capitalised words in a row
    pub static ref CAPITALISED_SEQUENCE: Regex = Regex::new(
        r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){1,3}\b"
    ).unwrap();

    // Lines naming someone other than the candidate
    pub static ref RELATION_LINE: Regex = Regex::new(
        r"(?i)\b(?:father|mother|guardian|parent|principal|controller|registrar|signature|signed)\b"
    ).unwrap();

    // Opening code fence, with optional language tag
    pub static ref CODE_FENCE: Regex = Regex::new(
        r"^```[A-Za-z0-9_+-]*"
    ).unwrap();
}

/// Words that mark a capitalised sequence as document vocabulary rather than a name.
pub const DOCUMENT_VOCABULARY: &[&str] = &[
    "Academic", "Aggregate", "Annual", "Arts", "Biology", "Board", "Central", "Certificate",
    "Chemistry", "College", "Commerce", "Computer", "Council", "Date", "Delhi", "Division",
    "Education", "Engineering", "English", "Examination", "Grade", "Grand", "Higher", "Hindi",
    "Institute", "Marks", "Mathematics", "Maximum", "Minimum", "Name", "Number", "Obtained",
    "Passed", "Percentage", "Physical", "Physics", "Practical", "Public", "Result", "Roll",
    "School", "Science", "Secondary", "Senior", "Statement", "Subject", "Subjects", "Theory",
    "Total", "University", "Year",
];
