//! crates/learning_assistant_core/src/prompt.rs
//!
//! Renders user input into the instruction strings sent to the generation
//! backend. Every builder here is a pure function of its arguments.

use crate::domain::UserProfile;
use crate::pipeline::GenerationError;

pub const DEFAULT_SPECIFIC_GOAL: &str = "none specified";
pub const DEFAULT_WEEKLY_HOURS: f64 = 5.0;
pub const DEFAULT_EXPERIENCE_LEVEL: &str = "beginner";
pub const DEFAULT_LEARNING_STYLE: &str = "mixed";
pub const DEFAULT_MOTIVATION: &str = "personal interest";
pub const DEFAULT_RESOURCE_PREFERENCE: &str = "online courses";
pub const DEFAULT_LANGUAGE_PREFERENCE: &str = "Chinese";
pub const DEFAULT_PACE: &str = "steady";

/// Returns the trimmed value, or `default` when the field is absent or blank.
fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

/// Renders the plan instruction for a profile.
///
/// Fields are always written in the same order, so equal profiles produce
/// byte-identical prompts. Absent optional fields are replaced by the
/// `DEFAULT_*` constants of this module before rendering. Weekly hours that
/// are not a positive number are treated as absent; `LearningPipeline`
/// rejects them before a prompt is ever built.
pub fn build_plan_prompt(profile: &UserProfile) -> String {
    let weekly_hours = profile
        .weekly_hours
        .filter(|h| h.is_finite() && *h > 0.0)
        .unwrap_or(DEFAULT_WEEKLY_HOURS);
    let resources = or_default(&profile.resource_preference, DEFAULT_RESOURCE_PREFERENCE);
    let language = or_default(&profile.language_preference, DEFAULT_LANGUAGE_PREFERENCE);

    format!(
        "You are an experienced learning coach. Create a detailed, personalized learning plan.\n\
         \n\
         Learner profile:\n\
         - Learning goal: {goal}\n\
         - Specific goal: {specific_goal}\n\
         - Weekly available hours: {weekly_hours}\n\
         - Experience level: {experience}\n\
         - Learning style: {style}\n\
         - Motivation: {motivation}\n\
         - Resource preference: {resources}\n\
         - Language preference: {language}\n\
         - Pace: {pace}\n\
         \n\
         Structure the plan with these sections:\n\
         1. Overview: what the learner will achieve and how the plan is organized.\n\
         2. Weekly breakdown: step-by-step topics and tasks for each week, sized to {weekly_hours} hours per week.\n\
         3. Resource suggestions: only {resources} available in {language}.\n\
         4. Evaluation method: how the learner can measure progress at each stage.\n\
         \n\
         Write the whole plan in {language}.",
        goal = profile.goal.trim(),
        specific_goal = or_default(&profile.specific_goal, DEFAULT_SPECIFIC_GOAL),
        weekly_hours = weekly_hours,
        experience = or_default(&profile.experience_level, DEFAULT_EXPERIENCE_LEVEL),
        style = or_default(&profile.learning_style, DEFAULT_LEARNING_STYLE),
        motivation = or_default(&profile.motivation, DEFAULT_MOTIVATION),
        resources = resources,
        language = language,
        pace = or_default(&profile.pace, DEFAULT_PACE),
    )
}

/// Renders the lecture instruction for one section of an existing plan.
pub fn build_lecture_prompt(plan_content: &str, section: &str) -> Result<String, GenerationError> {
    let plan_content = plan_content.trim();
    let section = section.trim();
    if plan_content.is_empty() {
        return Err(GenerationError::InvalidInput(
            "plan content must not be empty".to_string(),
        ));
    }
    if section.is_empty() {
        return Err(GenerationError::InvalidInput(
            "section must not be empty".to_string(),
        ));
    }

    Ok(format!(
        "You are an expert teacher. Below is a learning plan followed by one of its sections.\n\
         \n\
         LEARNING PLAN:\n\
         ---\n\
         {plan_content}\n\
         ---\n\
         \n\
         SECTION: {section}\n\
         \n\
         Write an in-depth lecture for this section only. Explain the key concepts with examples, \
         stay consistent with the plan above, and use the same language as the plan.\n\
         Finish with:\n\
         - Supplementary resources: a short list of links for further study.\n\
         - Practice exercise: one exercise the learner can do to check their understanding."
    ))
}

/// Renders the instruction for answering a free-form question.
pub fn build_question_prompt(question: &str) -> Result<String, GenerationError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(GenerationError::InvalidInput(
            "question must not be empty".to_string(),
        ));
    }
    Ok(format!("Answer the following question in detail: {question}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> UserProfile {
        UserProfile {
            goal: "learn Rust".to_string(),
            specific_goal: Some("write a web service".to_string()),
            weekly_hours: Some(7.5),
            experience_level: Some("intermediate".to_string()),
            learning_style: Some("hands-on".to_string()),
            motivation: Some("career".to_string()),
            resource_preference: Some("books".to_string()),
            language_preference: Some("English".to_string()),
            pace: Some("fast".to_string()),
        }
    }

    #[test]
    fn goal_only_profile_renders_every_default() {
        let prompt = build_plan_prompt(&UserProfile::with_goal("learn Go"));

        assert!(prompt.contains("Learning goal: learn Go"));
        assert!(prompt.contains(&format!("Specific goal: {DEFAULT_SPECIFIC_GOAL}")));
        assert!(prompt.contains("Weekly available hours: 5\n"));
        assert!(prompt.contains(&format!("Experience level: {DEFAULT_EXPERIENCE_LEVEL}")));
        assert!(prompt.contains(&format!("Learning style: {DEFAULT_LEARNING_STYLE}")));
        assert!(prompt.contains(&format!("Motivation: {DEFAULT_MOTIVATION}")));
        assert!(prompt.contains(&format!("Resource preference: {DEFAULT_RESOURCE_PREFERENCE}")));
        assert!(prompt.contains(&format!("Language preference: {DEFAULT_LANGUAGE_PREFERENCE}")));
        assert!(prompt.contains(&format!("Pace: {DEFAULT_PACE}")));
    }

    #[test]
    fn blank_optional_fields_fall_back_to_defaults() {
        let mut profile = UserProfile::with_goal("learn Go");
        profile.experience_level = Some("   ".to_string());
        profile.language_preference = Some(String::new());
        profile.weekly_hours = Some(0.0);

        let prompt = build_plan_prompt(&profile);
        assert_eq!(prompt, build_plan_prompt(&UserProfile::with_goal("learn Go")));
    }

    #[test]
    fn supplied_fields_are_embedded() {
        let prompt = build_plan_prompt(&full_profile());

        for expected in [
            "learn Rust",
            "write a web service",
            "Weekly available hours: 7.5",
            "intermediate",
            "hands-on",
            "career",
            "only books available in English",
            "fast",
            "Write the whole plan in English.",
        ] {
            assert!(prompt.contains(expected), "missing {expected:?}");
        }
    }

    #[test]
    fn plan_prompt_asks_for_every_section() {
        let prompt = build_plan_prompt(&UserProfile::with_goal("learn Go"));
        for section in ["Overview", "Weekly breakdown", "Resource suggestions", "Evaluation method"] {
            assert!(prompt.contains(section), "missing {section}");
        }
    }

    #[test]
    fn plan_prompt_is_deterministic() {
        let profile = full_profile();
        let first = build_plan_prompt(&profile);
        for _ in 0..10 {
            assert_eq!(first, build_plan_prompt(&profile.clone()));
        }
    }

    #[test]
    fn lecture_prompt_requires_plan_and_section() {
        assert!(matches!(
            build_lecture_prompt("", "intro"),
            Err(GenerationError::InvalidInput(_))
        ));
        assert!(matches!(
            build_lecture_prompt("Week 1: basics.", "  "),
            Err(GenerationError::InvalidInput(_))
        ));

        let prompt = build_lecture_prompt("Week 1: basics.", "Week 1").unwrap();
        assert!(prompt.contains("Week 1: basics."));
        assert!(prompt.contains("SECTION: Week 1"));
        assert!(prompt.contains("Practice exercise"));
        assert!(prompt.contains("Supplementary resources"));
    }

    #[test]
    fn question_prompt_rejects_blank_question() {
        assert!(build_question_prompt(" ").is_err());
        assert_eq!(
            build_question_prompt("What is ownership?").unwrap(),
            "Answer the following question in detail: What is ownership?"
        );
    }
}
