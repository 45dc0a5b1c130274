pub mod openai;

use std::sync::Arc;

use anyhow::Result;

/// Trait for judging whether two sequential events are causally related.
///
/// `Ok(Some(phrase))` affirms the link with a short relationship description;
/// `Ok(None)` denies it. Errors mean the judge was unreachable — callers
/// treat that the same as a denial, never as a hard failure.
///
/// Synchronous by design: callers in async contexts use
/// `tokio::task::spawn_blocking`, and implementations bound their own I/O
/// with timeouts.
pub trait CausalityJudge: Send + Sync {
    fn judge(&self, cause_text: &str, effect_text: &str) -> Result<Option<String>>;
}

/// Create the default judge from config: an OpenAI-compatible chat endpoint.
pub fn create_judge(config: &crate::config::JudgeConfig) -> Result<Arc<dyn CausalityJudge>> {
    Ok(Arc::new(openai::OpenAiJudge::from_env(config)?))
}
