mod backend;
#[cfg(feature = "vision-opencv")]
mod cascade;
mod scripted;

pub use backend::ObjectDetector;
#[cfg(feature = "vision-opencv")]
pub use cascade::HaarCascade;
pub use scripted::ScriptedDetector;
