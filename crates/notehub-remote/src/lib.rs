pub mod error;
pub mod exec;
pub mod genai;

pub use error::{RemoteError, RemoteResult};
pub use exec::{ExecClient, RunOutcome};
pub use genai::GenAiClient;
