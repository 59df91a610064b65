pub mod application;
pub mod cv;
pub mod queue_item;
pub mod workflow;

pub use application::Application;
pub use cv::Cv;
pub use queue_item::{JobPayload, QueueItem};
pub use workflow::Workflow;
