//! Asset generation for the ShortVid pipeline.
//!
//! Wraps the external collaborators one call each: script text from the
//! language model, one image per scene, one audio clip per line, and title
//! assets. Image and audio failures degrade to placeholders/empty markers
//! instead of propagating; script failures are fatal to the job.

mod error;
pub mod extract;
mod image_client;
mod llm;
mod placeholder;
mod producer;
mod speech;

pub use error::{GenError, GenResult};
pub use image_client::{build_image_prompt, ImageClient};
pub use llm::{build_script_prompt, build_topic_prompt, ChatClient, TopicSuggestion};
pub use placeholder::{render_placeholder, render_title_card, FRAME_HEIGHT, FRAME_WIDTH};
pub use producer::{AssetProducer, GenAssetProducer};
pub use speech::SpeechClient;
