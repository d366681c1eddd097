pub mod anthropic;
pub mod prompt_builder;
pub mod prompts;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use indicatif::ProgressBar;
use tokio::task::JoinSet;

use crate::error::GenerationError;
use prompts::PromptVariant;

/// Trait for talking to a text-generation model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-turn completion: the prompt is the whole user input.
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Run one completion per variant concurrently.
///
/// All-or-nothing: the first failure aborts the remaining requests and is
/// returned; successful completions from the same batch are discarded.
pub async fn invoke_all(
    client: Arc<dyn LlmClient>,
    prompts: BTreeMap<PromptVariant, String>,
    progress: Option<&ProgressBar>,
) -> Result<BTreeMap<PromptVariant, String>, GenerationError> {
    let mut tasks = JoinSet::new();
    let mut spawned = Vec::with_capacity(prompts.len());

    for (variant, prompt) in prompts {
        let client = Arc::clone(&client);
        spawned.push(variant);
        tasks.spawn(async move {
            log::debug!("Requesting {variant} completion");
            let result = client.complete(&prompt).await;
            (variant, result)
        });
    }

    let mut completions = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (variant, result) = joined.map_err(|e| GenerationError::Task {
            variant: pending_variants(&spawned, &completions),
            reason: e.to_string(),
        })?;

        match result {
            Ok(text) => {
                log::debug!("{variant} completion received ({} chars)", text.len());
                completions.insert(variant, text);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            }
            Err(e) => {
                log::error!("{variant} generation failed: {e}");
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    Ok(completions)
}

fn pending_variants(
    spawned: &[PromptVariant],
    done: &BTreeMap<PromptVariant, String>,
) -> String {
    spawned
        .iter()
        .filter(|v| !done.contains_key(v))
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("/")
}
