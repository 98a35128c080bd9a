use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessState {
    #[default]
    Idle,
    FaceDetecting,
    FaceRecognized,
    PpeChecking,
    AccessGranted,
    AccessDenied,
}

impl AccessState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::FaceDetecting => "FACE_DETECTING",
            Self::FaceRecognized => "FACE_RECOGNIZED",
            Self::PpeChecking => "PPE_CHECKING",
            Self::AccessGranted => "ACCESS_GRANTED",
            Self::AccessDenied => "ACCESS_DENIED",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::Idle => "Please stand in front of camera",
            Self::FaceDetecting => "Detecting face...",
            Self::FaceRecognized => "Identity verified",
            Self::PpeChecking => "Checking PPE equipment...",
            Self::AccessGranted => "Welcome! Door opening...",
            Self::AccessDenied => "Access denied",
        }
    }
}

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    Head,
    Face,
    Eyes,
    Ears,
    Mouth,
    Chest,
    HandsLeft,
    HandsRight,
    Feet,
}

impl Region {
    pub const ALL: [Region; 9] = [
        Region::Head,
        Region::Face,
        Region::Eyes,
        Region::Ears,
        Region::Mouth,
        Region::Chest,
        Region::HandsLeft,
        Region::HandsRight,
        Region::Feet,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Face => "face",
            Self::Eyes => "eyes",
            Self::Ears => "ears",
            Self::Mouth => "mouth",
            Self::Chest => "chest",
            Self::HandsLeft => "hands-left",
            Self::HandsRight => "hands-right",
            Self::Feet => "feet",
        }
    }

    /// Equipment class names that satisfy this region. Compared case-insensitively.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::Head => &["Head", "Helmet"],
            Self::Face => &["Face", "Face-mask-medical"],
            Self::Eyes => &["Glasses", "Face-guard"],
            Self::Ears => &["Ear", "Earmuffs"],
            Self::Mouth => &["Face-mask-medical"],
            Self::Chest => &["Safety-vest", "Medical-suit", "Safety-suit"],
            Self::HandsLeft | Self::HandsRight => &["Hands", "Gloves"],
            Self::Feet => &["Foot", "Shoes"],
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Head => "Head/Helmet",
            Self::Face => "Face/Mask",
            Self::Eyes => "Eye Protection",
            Self::Ears => "Ear Protection",
            Self::Mouth => "Face Mask",
            Self::Chest => "Body Protection",
            Self::HandsLeft => "Left Hand/Glove",
            Self::HandsRight => "Right Hand/Glove",
            Self::Feet => "Footwear",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionStatus {
    NotRequired,
    RequiredAndDetected,
    RequiredAndMissing,
}

impl RegionStatus {
    pub fn color(self) -> &'static str {
        match self {
            Self::NotRequired => "#9CA3AF",
            Self::RequiredAndDetected => "#10B981",
            Self::RequiredAndMissing => "#EF4444",
        }
    }

    pub fn is_required(self) -> bool {
        self != Self::NotRequired
    }
}
