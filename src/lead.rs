use serde::{Deserialize, Serialize};
use std::fmt;

/// Acquisition channel a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Google,
    TikTok,
    Other,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Facebook,
        Platform::Google,
        Platform::TikTok,
        Platform::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Platform::Facebook => "Facebook",
            Platform::Google => "Google",
            Platform::TikTok => "TikTok",
            Platform::Other => "Other",
        }
    }

    /// Case-insensitive match on the label or one of the short aliases
    /// (`fb`, `gg`, `tt`). Returns `None` for anything else.
    pub fn recognize(raw: &str) -> Option<Platform> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "facebook" | "fb" => Some(Platform::Facebook),
            "google" | "gg" => Some(Platform::Google),
            "tiktok" | "tik tok" | "tt" => Some(Platform::TikTok),
            "other" => Some(Platform::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline stage of a lead in the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "New Lead")]
    NewLead,
    Potential,
    #[serde(rename = "Hot Case")]
    HotCase,
    #[serde(rename = "Meeting Done")]
    MeetingDone,
    #[serde(rename = "No Answer")]
    NoAnswer,
    #[serde(rename = "Call Back")]
    CallBack,
    Whatsapp,
    #[serde(rename = "Wrong Number")]
    WrongNumber,
    #[serde(rename = "Non Potential")]
    NonPotential,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::NewLead,
        Stage::Potential,
        Stage::HotCase,
        Stage::MeetingDone,
        Stage::NoAnswer,
        Stage::CallBack,
        Stage::Whatsapp,
        Stage::WrongNumber,
        Stage::NonPotential,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::NewLead => "New Lead",
            Stage::Potential => "Potential",
            Stage::HotCase => "Hot Case",
            Stage::MeetingDone => "Meeting Done",
            Stage::NoAnswer => "No Answer",
            Stage::CallBack => "Call Back",
            Stage::Whatsapp => "Whatsapp",
            Stage::WrongNumber => "Wrong Number",
            Stage::NonPotential => "Non Potential",
        }
    }

    /// Case-insensitive; `_` and `-` count as spaces, so `hot_case` is `Hot Case`.
    pub fn recognize(raw: &str) -> Option<Stage> {
        let wanted: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '-' => ' ',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.label().to_ascii_lowercase() == wanted)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One validated lead, ready to be handed to a [`crate::LeadStore`].
///
/// `client_name` and `client_phone` are never empty for records produced by
/// the parser. Optional fields are `None` rather than empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub client_name: String,
    pub client_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_job_title: Option<String>,
    pub platform: Platform,
    pub stage: Stage,
}

impl LeadRecord {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            client_name: name.into(),
            client_phone: phone.into(),
            client_phone2: None,
            client_phone3: None,
            client_email: None,
            client_job_title: None,
            platform: Platform::Other,
            stage: Stage::NewLead,
        }
    }

    /// Fields in the canonical column order, absent ones as `""`.
    pub fn cells(&self) -> [&str; 8] {
        [
            self.client_name.as_str(),
            self.client_phone.as_str(),
            self.client_phone2.as_deref().unwrap_or_default(),
            self.client_phone3.as_deref().unwrap_or_default(),
            self.client_email.as_deref().unwrap_or_default(),
            self.client_job_title.as_deref().unwrap_or_default(),
            self.platform.label(),
            self.stage.label(),
        ]
    }
}
