//! Onboarding state — the current step plus the accumulating form.

use serde::{Deserialize, Serialize};

use super::model::{
    Education, FormData, LanguageSkill, OnboardingStep, REGULAR_RATE_RANGE, STEP_COUNT, StepStatus,
    TRIAL_RATE_RANGE, step_status,
};

/// A single step-scoped edit. Applying one never touches fields owned by
/// other steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Country(String),
    /// Insert or replace the entry for this language.
    AddLanguage(LanguageSkill),
    RemoveLanguage(String),
    Headline(String),
    Bio(String),
    /// Clamped to `REGULAR_RATE_RANGE`.
    RegularRate(u32),
    /// Clamped to `TRIAL_RATE_RANGE`.
    TrialRate(u32),
    AddSubject(String),
    RemoveSubject(String),
    AddEducation(Education),
    RemoveEducation(usize),
}

/// In-progress tutor profile construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingState {
    current_step: OnboardingStep,
    form: FormData,
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self {
            current_step: OnboardingStep::first(),
            form: FormData::default(),
        }
    }
}

impl OnboardingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> OnboardingStep {
        self.current_step
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn status_of(&self, step: OnboardingStep) -> StepStatus {
        step_status(step, self.current_step)
    }

    /// Progress bar fill, 0 on the first step and 100 on the last.
    pub fn progress_percent(&self) -> u8 {
        let done = u32::from(self.current_step.index() - 1);
        let span = u32::from(STEP_COUNT - 1);
        (done * 100 / span) as u8
    }

    pub fn can_retreat(&self) -> bool {
        self.current_step.previous().is_some()
    }

    /// Label of the forward action.
    pub fn primary_action(&self) -> &'static str {
        if self.current_step.is_last() {
            "Finish"
        } else {
            "Next"
        }
    }

    /// Move back one step, floored at the first. Form data is untouched.
    pub fn retreat(&mut self) -> OnboardingStep {
        if let Some(previous) = self.current_step.previous() {
            self.current_step = previous;
        }
        self.current_step
    }

    /// Move forward one step. `None` on the last step.
    pub(crate) fn step_forward(&mut self) -> Option<OnboardingStep> {
        let next = self.current_step.next()?;
        self.current_step = next;
        Some(next)
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        let form = &mut self.form;
        match update {
            FieldUpdate::Country(country) => form.country = country,
            FieldUpdate::AddLanguage(skill) => {
                match form
                    .languages
                    .iter_mut()
                    .find(|l| l.language.eq_ignore_ascii_case(&skill.language))
                {
                    Some(existing) => *existing = skill,
                    None => form.languages.push(skill),
                }
            }
            FieldUpdate::RemoveLanguage(language) => form
                .languages
                .retain(|l| !l.language.eq_ignore_ascii_case(&language)),
            FieldUpdate::Headline(headline) => form.headline = headline,
            FieldUpdate::Bio(bio) => form.bio = bio,
            FieldUpdate::RegularRate(rate) => {
                form.pricing.regular = rate.clamp(*REGULAR_RATE_RANGE.start(), *REGULAR_RATE_RANGE.end())
            }
            FieldUpdate::TrialRate(rate) => {
                form.pricing.trial = rate.clamp(*TRIAL_RATE_RANGE.start(), *TRIAL_RATE_RANGE.end())
            }
            FieldUpdate::AddSubject(slug) => {
                if !form.subjects.contains(&slug) {
                    form.subjects.push(slug);
                }
            }
            FieldUpdate::RemoveSubject(slug) => form.subjects.retain(|s| *s != slug),
            FieldUpdate::AddEducation(entry) => form.education.push(entry),
            FieldUpdate::RemoveEducation(index) => {
                if index < form.education.len() {
                    form.education.remove(index);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::Proficiency;

    #[test]
    fn default_state() {
        let state = OnboardingState::default();
        assert_eq!(state.current_step(), OnboardingStep::About);
        assert_eq!(state.form(), &FormData::default());
        assert!(!state.can_retreat());
        assert_eq!(state.progress_percent(), 0);
        assert_eq!(state.primary_action(), "Next");
    }

    #[test]
    fn step_forward_stops_at_last() {
        let mut state = OnboardingState::new();
        for _ in 1..STEP_COUNT {
            assert!(state.step_forward().is_some());
        }
        assert_eq!(state.current_step(), OnboardingStep::Background);
        assert_eq!(state.progress_percent(), 100);
        assert_eq!(state.primary_action(), "Finish");
        assert_eq!(state.step_forward(), None);
        assert_eq!(state.current_step(), OnboardingStep::Background);
    }

    #[test]
    fn retreat_is_floored_and_keeps_form() {
        let mut state = OnboardingState::new();
        state.apply(FieldUpdate::Country("UK".into()));
        state.step_forward();
        state.apply(FieldUpdate::Headline("Math tutor".into()));

        let before = state.form().clone();
        assert_eq!(state.retreat(), OnboardingStep::About);
        assert_eq!(state.retreat(), OnboardingStep::About);
        assert_eq!(state.form(), &before);
    }

    #[test]
    fn status_tracks_current_step() {
        let mut state = OnboardingState::new();
        state.step_forward();
        assert_eq!(state.status_of(OnboardingStep::About), StepStatus::Completed);
        assert_eq!(state.status_of(OnboardingStep::Profile), StepStatus::Active);
        assert_eq!(state.status_of(OnboardingStep::Photo), StepStatus::Pending);
    }

    #[test]
    fn progress_is_proportional() {
        let mut state = OnboardingState::new();
        state.step_forward();
        state.step_forward();
        state.step_forward();
        // Step 4 of 7: 3/6 of the bar.
        assert_eq!(state.progress_percent(), 50);
    }

    #[test]
    fn updates_merge_without_touching_other_steps() {
        let mut state = OnboardingState::new();
        state.apply(FieldUpdate::Country("US".into()));
        state.apply(FieldUpdate::Headline("Certified tutor".into()));
        state.apply(FieldUpdate::Bio("Hello".into()));
        state.apply(FieldUpdate::RegularRate(35));
        state.apply(FieldUpdate::AddSubject("math".into()));

        let form = state.form();
        assert_eq!(form.country, "US");
        assert_eq!(form.headline, "Certified tutor");
        assert_eq!(form.bio, "Hello");
        assert_eq!(form.pricing.regular, 35);
        assert_eq!(form.pricing.trial, 5);
        assert_eq!(form.subjects, vec!["math"]);
        assert_eq!(form.languages.len(), 1);
    }

    #[test]
    fn rates_are_clamped() {
        let mut state = OnboardingState::new();
        state.apply(FieldUpdate::RegularRate(500));
        state.apply(FieldUpdate::TrialRate(0));
        assert_eq!(state.form().pricing.regular, 100);
        assert_eq!(state.form().pricing.trial, 1);

        state.apply(FieldUpdate::RegularRate(1));
        assert_eq!(state.form().pricing.regular, 5);
    }

    #[test]
    fn language_updates_replace_by_name() {
        let mut state = OnboardingState::new();
        state.apply(FieldUpdate::AddLanguage(LanguageSkill::new("Spanish", Proficiency::Advanced)));
        state.apply(FieldUpdate::AddLanguage(LanguageSkill::new("spanish", Proficiency::Fluent)));
        assert_eq!(state.form().languages.len(), 2);
        assert_eq!(state.form().languages[1].proficiency, Proficiency::Fluent);

        state.apply(FieldUpdate::RemoveLanguage("ENGLISH".into()));
        assert_eq!(state.form().languages.len(), 1);
        assert_eq!(state.form().languages[0].language, "spanish");
    }

    #[test]
    fn subjects_and_education_collections() {
        let mut state = OnboardingState::new();
        state.apply(FieldUpdate::AddSubject("math".into()));
        state.apply(FieldUpdate::AddSubject("math".into()));
        state.apply(FieldUpdate::AddSubject("physics".into()));
        state.apply(FieldUpdate::RemoveSubject("math".into()));
        assert_eq!(state.form().subjects, vec!["physics"]);

        state.apply(FieldUpdate::AddEducation(Education {
            institution: "MIT".into(),
            degree: "MSc Mathematics".into(),
            graduation_year: Some(2015),
        }));
        state.apply(FieldUpdate::RemoveEducation(5));
        assert_eq!(state.form().education.len(), 1);
        state.apply(FieldUpdate::RemoveEducation(0));
        assert!(state.form().education.is_empty());
    }

    #[test]
    fn state_serde_roundtrip() {
        let mut state = OnboardingState::new();
        state.step_forward();
        state.apply(FieldUpdate::Headline("Spanish with Maria".into()));

        let json = serde_json::to_string(&state).unwrap();
        let parsed: OnboardingState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
