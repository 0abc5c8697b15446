//! Visual style definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Available visual styles.
///
/// Each style carries a detailed image prompt plus a small set of
/// consistency keywords that are prepended to every scene prompt so all
/// images of one video read as the same artist's work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoStyle {
    /// Hand-drawn Ghibli-like animation
    Ghibli,
    /// Modern anime with cel shading
    Anime,
    /// Photorealistic
    Realistic,
    /// Traditional watercolor
    Watercolor,
}

/// RGB palette used for locally rendered frames (placeholders, title cards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylePalette {
    pub background: [u8; 3],
    pub foreground: [u8; 3],
    pub accent: [u8; 3],
}

impl VideoStyle {
    /// All available styles.
    pub const ALL: &'static [VideoStyle] = &[
        VideoStyle::Ghibli,
        VideoStyle::Anime,
        VideoStyle::Realistic,
        VideoStyle::Watercolor,
    ];

    /// Human-readable style name.
    pub fn display_name(&self) -> &'static str {
        match self {
            VideoStyle::Ghibli => "Ghibli-style animation",
            VideoStyle::Anime => "Modern anime",
            VideoStyle::Realistic => "Photorealistic",
            VideoStyle::Watercolor => "Watercolor painting",
        }
    }

    /// Short catalog description.
    pub fn description(&self) -> &'static str {
        match self {
            VideoStyle::Ghibli => "Consistent hand-drawn animation with soft pastel colors",
            VideoStyle::Anime => "Unified modern anime and manga look",
            VideoStyle::Realistic => "Consistent professional photography look",
            VideoStyle::Watercolor => "Unified traditional watercolor touch",
        }
    }

    /// Detailed prompt fragment appended to every image request.
    pub fn style_prompt(&self) -> &'static str {
        match self {
            VideoStyle::Ghibli => {
                "hand-drawn Studio Ghibli animation style, soft pastel colors, gentle \
                 watercolor textures, detailed natural backgrounds, whimsical atmosphere, \
                 warm golden lighting, anime cel animation, painterly brushstrokes, \
                 nostalgic mood, high detail illustration, cinematic composition"
            }
            VideoStyle::Anime => {
                "modern anime art style, clean vector lines, vibrant saturated colors, \
                 cel shading, detailed character design, sharp clean edges, professional \
                 anime illustration, bright lighting, consistent character proportions, \
                 Japanese animation style"
            }
            VideoStyle::Realistic => {
                "photorealistic, professional photography, natural lighting, high \
                 resolution, detailed textures, realistic materials, sharp focus, \
                 natural colors, documentary style, commercial photography quality"
            }
            VideoStyle::Watercolor => {
                "traditional watercolor painting, soft flowing brushstrokes, translucent \
                 layers, gentle color bleeding, artistic paper texture, hand-painted \
                 aesthetic, delicate washes, organic fluid shapes, traditional art medium"
            }
        }
    }

    /// Keywords repeated across scene prompts to keep the style uniform.
    pub fn consistency_keywords(&self) -> &'static [&'static str] {
        match self {
            VideoStyle::Ghibli => &[
                "Studio Ghibli style",
                "hand-drawn animation",
                "soft lighting",
                "detailed backgrounds",
            ],
            VideoStyle::Anime => &[
                "anime art style",
                "cel shading",
                "clean lines",
                "vibrant colors",
            ],
            VideoStyle::Realistic => &[
                "photorealistic",
                "professional photography",
                "natural lighting",
                "high detail",
            ],
            VideoStyle::Watercolor => &[
                "watercolor painting",
                "soft brushstrokes",
                "translucent",
                "hand-painted",
            ],
        }
    }

    /// Image API quality setting.
    pub fn image_quality(&self) -> &'static str {
        "hd"
    }

    /// Image API style setting.
    pub fn image_style(&self) -> &'static str {
        match self {
            VideoStyle::Anime => "vivid",
            _ => "natural",
        }
    }

    /// Palette for locally rendered placeholder frames.
    pub fn placeholder_palette(&self) -> StylePalette {
        match self {
            VideoStyle::Ghibli => StylePalette {
                background: [0xE8, 0xF4, 0xFD],
                foreground: [0x2E, 0x4F, 0x3D],
                accent: [0x7F, 0xB0, 0x69],
            },
            VideoStyle::Anime => StylePalette {
                background: [0xFF, 0xF0, 0xF8],
                foreground: [0x2D, 0x37, 0x48],
                accent: [0xFF, 0x6B, 0x9D],
            },
            VideoStyle::Realistic => StylePalette {
                background: [0xF7, 0xFA, 0xFC],
                foreground: [0x1A, 0x20, 0x2C],
                accent: [0x4A, 0x55, 0x68],
            },
            VideoStyle::Watercolor => StylePalette {
                background: [0xF0, 0xF8, 0xF8],
                foreground: [0x2C, 0x5F, 0x5F],
                accent: [0x4A, 0x90, 0xA4],
            },
        }
    }

    /// Darker palette for title cards.
    pub fn title_palette(&self) -> StylePalette {
        match self {
            VideoStyle::Ghibli => StylePalette {
                background: [0x2E, 0x4F, 0x3D],
                foreground: [0xF0, 0xF8, 0xF0],
                accent: [0x7F, 0xB0, 0x69],
            },
            VideoStyle::Anime => StylePalette {
                background: [0x1A, 0x1A, 0x2E],
                foreground: [0xFF, 0xFF, 0xFF],
                accent: [0xFF, 0x6B, 0x9D],
            },
            VideoStyle::Realistic => StylePalette {
                background: [0x00, 0x00, 0x00],
                foreground: [0xFF, 0xFF, 0xFF],
                accent: [0x4A, 0x90, 0xA4],
            },
            VideoStyle::Watercolor => StylePalette {
                background: [0x2C, 0x3E, 0x50],
                foreground: [0xEC, 0xF0, 0xF1],
                accent: [0x34, 0x98, 0xDB],
            },
        }
    }

    /// Returns the style name as used in filenames.
    pub fn as_filename_part(&self) -> &'static str {
        match self {
            VideoStyle::Ghibli => "ghibli",
            VideoStyle::Anime => "anime",
            VideoStyle::Realistic => "realistic",
            VideoStyle::Watercolor => "watercolor",
        }
    }
}

impl fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filename_part())
    }
}

impl FromStr for VideoStyle {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ghibli" => Ok(VideoStyle::Ghibli),
            "anime" => Ok(VideoStyle::Anime),
            "realistic" => Ok(VideoStyle::Realistic),
            "watercolor" => Ok(VideoStyle::Watercolor),
            _ => Err(StyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown style: {0}")]
pub struct StyleParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("ghibli".parse::<VideoStyle>().unwrap(), VideoStyle::Ghibli);
        assert_eq!("GHIBLI".parse::<VideoStyle>().unwrap(), VideoStyle::Ghibli);
        assert!("vaporwave".parse::<VideoStyle>().is_err());
    }

    #[test]
    fn test_style_serde_snake_case() {
        let json = serde_json::to_string(&VideoStyle::Watercolor).unwrap();
        assert_eq!(json, "\"watercolor\"");
        let back: VideoStyle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VideoStyle::Watercolor);
    }

    #[test]
    fn test_palettes_differ_per_style() {
        let palettes: Vec<_> = VideoStyle::ALL
            .iter()
            .map(|s| s.placeholder_palette().background)
            .collect();
        for (i, a) in palettes.iter().enumerate() {
            for b in palettes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
