use crate::utils::error::GenError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Editorial,
    Streetwear,
    Vintage,
    Minimalist,
    Artistic,
}

impl Style {
    pub const ALL: [Style; 5] = [
        Style::Editorial,
        Style::Streetwear,
        Style::Vintage,
        Style::Minimalist,
        Style::Artistic,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Style::Editorial => "editorial",
            Style::Streetwear => "streetwear",
            Style::Vintage => "vintage",
            Style::Minimalist => "minimalist",
            Style::Artistic => "artistic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Style::Editorial => "Editorial",
            Style::Streetwear => "Streetwear",
            Style::Vintage => "Vintage",
            Style::Minimalist => "Minimalist",
            Style::Artistic => "Artistic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Style::Editorial => "Clean, professional style for magazines and publications",
            Style::Streetwear => "Urban, contemporary aesthetic with bold colors and graphics",
            Style::Vintage => "Nostalgic, retro-inspired with classic styling and warm tones",
            Style::Minimalist => "Simple, clean design with focus on essential elements",
            Style::Artistic => "Creative, expressive style with painterly effects",
        }
    }

    /// Background colour (hex, no `#`) used for placeholder renders.
    pub fn placeholder_color(&self) -> &'static str {
        match self {
            Style::Editorial => "e8e8e8",
            Style::Streetwear => "ff6b6b",
            Style::Vintage => "d4a574",
            Style::Minimalist => "f5f5f5",
            Style::Artistic => "9b59b6",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Style {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Style::ALL
            .into_iter()
            .find(|style| style.id() == wanted)
            .ok_or_else(|| GenError::InvalidConfigValueError {
                field: "style".to_string(),
                value: s.to_string(),
                reason: format!(
                    "Unknown style. Valid styles: {}",
                    Style::ALL.map(|style| style.id()).join(", ")
                ),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
    pub prompt: String,
    pub style: Style,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, style: Style) -> Self {
        Self {
            image_data_url: None,
            prompt: prompt.into(),
            style,
        }
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.image_data_url = Some(data_url.into());
        self
    }
}

/// A single finished generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub id: String,
    pub image_url: String,
    pub prompt: String,
    pub style: Style,
    pub created_at: DateTime<Utc>,
}

pub type HistoryItem = GenerateResponse;
