//! Rule-based field extractors for marksheets.

pub mod grades;
pub mod names;
pub mod patterns;

pub use grades::{extract_grade_candidates, numeric_tokens, pick_grade, GradeRange};
pub use names::{EntityRecognizer, PersonNameRecognizer};
