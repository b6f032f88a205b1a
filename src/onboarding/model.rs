//! Instructor onboarding data models: steps, derived step status, and the
//! accumulating profile form.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Number of onboarding steps.
pub const STEP_COUNT: u8 = 7;

/// Soft limit shown next to the bio field.
pub const BIO_MAX_CHARS: usize = 1000;

/// Accepted hourly rate, in whole currency units.
pub const REGULAR_RATE_RANGE: RangeInclusive<u32> = 5..=100;

/// Accepted trial lesson price, in whole currency units.
pub const TRIAL_RATE_RANGE: RangeInclusive<u32> = 1..=50;

/// The ordered onboarding steps.
///
/// Progresses linearly: About → Profile → Photo → Video → Pricing →
/// Subjects → Background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    About = 1,
    Profile = 2,
    Photo = 3,
    Video = 4,
    Pricing = 5,
    Subjects = 6,
    Background = 7,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; STEP_COUNT as usize] = [
        Self::About,
        Self::Profile,
        Self::Photo,
        Self::Video,
        Self::Pricing,
        Self::Subjects,
        Self::Background,
    ];

    pub fn first() -> Self {
        Self::About
    }

    pub fn last() -> Self {
        Self::Background
    }

    /// 1-based position.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_index(self.index() - 1)
    }

    pub fn is_last(self) -> bool {
        self == Self::last()
    }

    /// Label shown in the progress bar.
    pub fn label(self) -> &'static str {
        match self {
            Self::About => "About",
            Self::Profile => "Profile",
            Self::Photo => "Photo",
            Self::Video => "Video",
            Self::Pricing => "Pricing",
            Self::Subjects => "Subjects",
            Self::Background => "Background",
        }
    }

    /// What the step presents, determined by the step alone.
    pub fn content(self) -> StepContent {
        match self {
            Self::About => StepContent::Form {
                fields: &["country", "languages"],
            },
            Self::Profile => StepContent::Form {
                fields: &["headline", "bio"],
            },
            Self::Photo => StepContent::MediaUnavailable {
                media: MediaKind::Photo,
            },
            Self::Video => StepContent::MediaUnavailable {
                media: MediaKind::Video,
            },
            Self::Pricing => StepContent::Form {
                fields: &["pricing.regular", "pricing.trial"],
            },
            Self::Subjects => StepContent::Form {
                fields: &["subjects"],
            },
            Self::Background => StepContent::Form {
                fields: &["education"],
            },
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::About => "about",
            Self::Profile => "profile",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Pricing => "pricing",
            Self::Subjects => "subjects",
            Self::Background => "background",
        };
        write!(f, "{s}")
    }
}

/// Media capture that is not available yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

/// Presentation of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepContent {
    /// Editable fields of `FormData`.
    Form { fields: &'static [&'static str] },
    /// Capture is unavailable. The step can be skipped with `advance()`.
    MediaUnavailable { media: MediaKind },
}

impl StepContent {
    pub fn is_skippable_placeholder(&self) -> bool {
        matches!(self, Self::MediaUnavailable { .. })
    }

    /// Notice shown in place of an unavailable capture step.
    pub fn notice(&self) -> Option<String> {
        let Self::MediaUnavailable { media } = self else {
            return None;
        };
        let what = match media {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        };
        Some(format!(
            "Feature coming soon. You can skip this step for now and add your {what} later from your dashboard."
        ))
    }
}

/// Display status of a step, derived from the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}

/// Status of `step` while the workflow sits on `current`.
pub fn step_status(step: OnboardingStep, current: OnboardingStep) -> StepStatus {
    match step.cmp(&current) {
        std::cmp::Ordering::Less => StepStatus::Completed,
        std::cmp::Ordering::Equal => StepStatus::Active,
        std::cmp::Ordering::Greater => StepStatus::Pending,
    }
}

/// Spoken-language proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
    Fluent,
    Native,
}

impl std::str::FromStr for Proficiency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "fluent" => Ok(Self::Fluent),
            "native" => Ok(Self::Native),
            other => Err(format!("unknown proficiency: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub language: String,
    pub proficiency: Proficiency,
}

impl LanguageSkill {
    pub fn new(language: impl Into<String>, proficiency: Proficiency) -> Self {
        Self {
            language: language.into(),
            proficiency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub regular: u32,
    pub trial: u32,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            regular: 20,
            trial: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<u16>,
}

/// Tutor profile under construction. Fields accumulate across steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    pub country: String,
    pub languages: Vec<LanguageSkill>,
    pub headline: String,
    pub bio: String,
    pub pricing: Pricing,
    /// Subject slugs, e.g. `"math"`.
    pub subjects: Vec<String>,
    pub education: Vec<Education>,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            country: String::new(),
            languages: vec![LanguageSkill::new("English", Proficiency::Native)],
            headline: String::new(),
            bio: String::new(),
            pricing: Pricing::default(),
            subjects: Vec::new(),
            education: Vec::new(),
        }
    }
}

impl FormData {
    /// Bio length in characters, for the `n/1000` counter.
    pub fn bio_len(&self) -> usize {
        self.bio.chars().count()
    }

    /// First required field of `step` that is still empty.
    pub fn missing_field(&self, step: OnboardingStep) -> Option<&'static str> {
        match step {
            OnboardingStep::About if self.country.trim().is_empty() => Some("country"),
            OnboardingStep::About if self.languages.is_empty() => Some("languages"),
            OnboardingStep::Profile if self.headline.trim().is_empty() => Some("headline"),
            OnboardingStep::Profile if self.bio.trim().is_empty() => Some("bio"),
            OnboardingStep::Subjects if self.subjects.is_empty() => Some("subjects"),
            _ => None,
        }
    }
}
