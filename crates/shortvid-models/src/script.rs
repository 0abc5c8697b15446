//! Generated script and scene types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::style::VideoStyle;

/// One line item of a script.
///
/// `text` is what gets spoken; `visual_concept` is prompt material for image
/// generation and is never surfaced to end users.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Spoken content
    pub text: String,
    /// Internal image prompt material
    pub visual_concept: String,
    /// Rough display duration in seconds
    #[serde(default = "default_duration", alias = "duration")]
    pub duration_hint: u32,
}

fn default_duration() -> u32 {
    5
}

/// An ordered script: title plus scenes in playback order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    pub title: String,
    pub style: VideoStyle,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script has no scenes")]
    Empty,

    #[error("Scene {0} has empty spoken text")]
    EmptyText(usize),

    #[error("Scene {0} text describes visuals: {1:?}")]
    VisualLeak(usize, String),
}

/// Phrases that indicate the spoken text is describing the picture instead
/// of the ranked content. Generation prompts forbid these, but the model is
/// not trusted to comply.
const VISUAL_PHRASES: &[&str] = &[
    "this image",
    "this picture",
    "the image shows",
    "the picture shows",
    "in the image",
    "in this picture",
    "as illustrated",
    "as depicted",
    "この画像",
    "この絵",
    "絵では",
    "画像では",
];

impl Script {
    /// Validate the hard business rules a usable script must satisfy.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.scenes.is_empty() {
            return Err(ScriptError::Empty);
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.text.trim().is_empty() {
                return Err(ScriptError::EmptyText(i));
            }
            if let Some(phrase) = leaked_visual_phrase(&scene.text) {
                return Err(ScriptError::VisualLeak(i, phrase.to_string()));
            }
        }
        Ok(())
    }
}

/// Returns the first visual-description phrase found in `text`, if any.
fn leaked_visual_phrase(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    VISUAL_PHRASES
        .iter()
        .copied()
        .find(|phrase| lower.contains(&phrase.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(text: &str) -> Scene {
        Scene {
            text: text.to_string(),
            visual_concept: "a clock at midnight".to_string(),
            duration_hint: 5,
        }
    }

    fn script(scenes: Vec<Scene>) -> Script {
        Script {
            title: "Top 3 diet mistakes".to_string(),
            style: VideoStyle::Ghibli,
            scenes,
        }
    }

    #[test]
    fn test_valid_script() {
        let s = script(vec![
            scene("Number three is eating late at night."),
            scene("Number two is skipping breakfast."),
        ]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_empty_script_rejected() {
        assert!(matches!(script(vec![]).validate(), Err(ScriptError::Empty)));
    }

    #[test]
    fn test_empty_text_rejected() {
        let s = script(vec![scene("ok"), scene("   ")]);
        assert!(matches!(s.validate(), Err(ScriptError::EmptyText(1))));
    }

    #[test]
    fn test_visual_leak_rejected() {
        let s = script(vec![
            scene("Number three is eating late."),
            scene("The image shows a clock pointing at midnight."),
        ]);
        assert!(matches!(s.validate(), Err(ScriptError::VisualLeak(1, _))));
    }

    #[test]
    fn test_visual_leak_case_insensitive() {
        let s = script(vec![scene("In This Picture you can see a salad.")]);
        assert!(matches!(s.validate(), Err(ScriptError::VisualLeak(0, _))));
    }

    #[test]
    fn test_duration_alias() {
        // Upstream emits "duration"; accept both spellings.
        let json = r#"{"text":"hi","visual_concept":"x","duration":7}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.duration_hint, 7);
    }
}
