use crate::models::GradeResult;

/// Count positions where the submitted answer equals the stored one,
/// ignoring case. Only the overlapping prefix of the two lists is compared.
pub fn grade<U, C>(user_answers: &[U], correct_answers: &[C]) -> u32
where
    U: AsRef<str>,
    C: AsRef<str>,
{
    let matches = user_answers
        .iter()
        .zip(correct_answers)
        .filter(|(given, expected)| answers_match(given.as_ref(), expected.as_ref()))
        .count();

    u32::try_from(matches).unwrap_or(u32::MAX)
}

/// Grade a submission against a quiz's stored answers. `total` is the number
/// of stored questions.
pub fn grade_submission<U, C>(user_answers: &[U], correct_answers: &[C]) -> GradeResult
where
    U: AsRef<str>,
    C: AsRef<str>,
{
    GradeResult {
        score: grade(user_answers, correct_answers),
        total: u32::try_from(correct_answers.len()).unwrap_or(u32::MAX),
    }
}

fn answers_match(given: &str, expected: &str) -> bool {
    given.to_lowercase() == expected.to_lowercase()
}
