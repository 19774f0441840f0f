// Eye configuration and the three animated quantities: blink, gaze, iris
pub mod base;
pub mod blink;
pub mod gaze;
pub mod iris;

pub use base::{EyeDefinition, GazeSample, GAZE_MAX, IRIS_MAX, IRIS_MIN, VERGENCE_PX};
pub use blink::{BlinkPhase, BlinkScheduler, BlinkState};
pub use gaze::{clamp_to_circle, AutonomousGaze, DrivenGaze, GazeSource, MotionPhase};
pub use iris::{AutonomousIris, DrivenIris, IrisSegment, IrisSource, IrisTimeline, LightConfig};
