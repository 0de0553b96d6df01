use serde::{Deserialize, Serialize};

/// Whether a step should also produce frames for a video sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    Off,
    Frames,
}

impl RenderMode {
    pub fn wants_frames(self) -> bool {
        self == RenderMode::Frames
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Task-level success reported by the environment.
    pub solved: bool,
    pub extra: serde_json::Value, // Keep it simple for now
}

impl StepInfo {
    pub fn solved(solved: bool) -> Self {
        Self {
            solved,
            extra: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
    /// The frame after this step, present only for [`RenderMode::Frames`].
    #[serde(skip)]
    pub frame: Option<Frame>,
}

/// One rendered RGB8 frame.
pub type Frame = image::RgbImage;
