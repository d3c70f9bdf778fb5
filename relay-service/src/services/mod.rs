pub mod knowledge;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod relay;

pub use knowledge::KnowledgeBlock;
pub use prompt::PromptTemplate;
pub use relay::{RelayError, RelayService};
