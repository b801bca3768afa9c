//! crates/podcast_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Wire formats live in `backend`; these types are what the rest of the crate
//! passes around.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A saved child record used to personalize generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// Unknown when the saved record has no readable date.
    pub birthdate: Option<NaiveDate>,
    pub interests: BTreeSet<String>,
}

/// The account-level profile: display name, Hoot balance and saved children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub balance: u32,
    pub children: Vec<Profile>,
}

/// Reading level the generated script is pitched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcademicLevel {
    #[default]
    KindergartenToFirst,
    SecondToThird,
    FourthToFifth,
    SixthToSeventh,
    EighthToNinth,
    TenthToEleventh,
    TwelfthPlus,
}

impl AcademicLevel {
    pub const ALL: [AcademicLevel; 7] = [
        Self::KindergartenToFirst,
        Self::SecondToThird,
        Self::FourthToFifth,
        Self::SixthToSeventh,
        Self::EighthToNinth,
        Self::TenthToEleventh,
        Self::TwelfthPlus,
    ];

    /// The label the backend expects, e.g. `"2nd Grade - 3rd Grade"`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::KindergartenToFirst => "Kindergarten - 1st Grade",
            Self::SecondToThird => "2nd Grade - 3rd Grade",
            Self::FourthToFifth => "4th Grade - 5th Grade",
            Self::SixthToSeventh => "6th Grade - 7th Grade",
            Self::EighthToNinth => "8th Grade - 9th Grade",
            Self::TenthToEleventh => "10th Grade - 11th Grade",
            Self::TwelfthPlus => "12th Grade+",
        }
    }

    /// Short code accepted on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            Self::KindergartenToFirst => "k-1",
            Self::SecondToThird => "2-3",
            Self::FourthToFifth => "4-5",
            Self::SixthToSeventh => "6-7",
            Self::EighthToNinth => "8-9",
            Self::TenthToEleventh => "10-11",
            Self::TwelfthPlus => "12+",
        }
    }
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AcademicLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| {
                level.code().eq_ignore_ascii_case(wanted) || level.label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unknown academic level '{}'", s))
    }
}

/// The kind of content the backend writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFormat {
    #[default]
    Podcast,
    Story,
    Poem,
}

impl ContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Podcast => "podcast",
            Self::Story => "story",
            Self::Poem => "poem",
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "podcast" => Ok(Self::Podcast),
            "story" => Ok(Self::Story),
            "poem" => Ok(Self::Poem),
            other => Err(format!("unknown content format '{}'", other)),
        }
    }
}

/// Everything needed to ask the backend for a script.
///
/// Held only in memory for the duration of one creation flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub subject_profiles: Vec<Profile>,
    pub anonymize: bool,
    pub academic_level: AcademicLevel,
    pub voice_id: String,
    pub content_format: ContentFormat,
}

impl GenerationRequest {
    /// Name used as `childName` on the audio job, if the request is personalized.
    pub fn lead_child_name(&self) -> Option<&str> {
        if self.anonymize {
            return None;
        }
        self.subject_profiles.first().map(|p| p.name.as_str())
    }
}

/// Server-side lifecycle status of an audio job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Failed,
    /// Any label the backend sends that this client does not know yet.
    /// Treated as non-terminal.
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "" | "PENDING" => Self::Pending,
            "PROCESSING" => Self::Processing,
            "COMPLETE" | "COMPLETED" => Self::Complete,
            "FAILED" => Self::Failed,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One server-tracked audio-generation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub script: Option<String>,
    pub audio_url: Option<String>,
    pub title: String,
    /// Status checks do not always carry the creation time; history records do.
    pub created_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// The finished product handed to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPodcast {
    pub job_id: String,
    pub title: String,
    pub script: Option<String>,
    pub audio_url: String,
}
