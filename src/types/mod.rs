//! Public types for the Muninn API.

mod message;
mod model;
mod operation;
mod outputs;
mod response;

pub use message::{Message, Role};
pub use model::{ModelConfig, ModelTable};
pub use operation::{CachePolicy, OperationType};
pub use outputs::{AtsScore, JobPosting, SkillGapAnalysis};
pub use response::{Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Usage};
