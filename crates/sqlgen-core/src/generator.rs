use crate::cache::ResultCache;
use crate::config::AppConfig;
use crate::examples::{ExampleStore, SelectionStrategy};
use crate::model::{GenerationParams, SchemaTable};
use crate::prompt;
use crate::providers::embedder::Embedder;
use crate::providers::llm::SqlModel;
use crate::schema;
use crate::validate::{self, Validation};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

/// Marker prefixed to every non-executable result. Downstream consumers
/// check for it instead of parsing errors.
pub const ERROR_PREFIX: &str = "-- Error";

pub fn is_error_result(sql: &str) -> bool {
    sql.starts_with(ERROR_PREFIX)
}

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub few_shot_enabled: bool,
    pub num_examples: usize,
    pub schema_optimization: bool,
    pub query_validation: bool,
    pub timeout_seconds: u64,
    pub params: GenerationParams,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            few_shot_enabled: true,
            num_examples: 3,
            schema_optimization: true,
            query_validation: true,
            timeout_seconds: 60,
            params: GenerationParams::default(),
        }
    }
}

impl GeneratorOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            few_shot_enabled: cfg.few_shot.enabled,
            num_examples: cfg.few_shot.num_examples,
            schema_optimization: cfg.performance.schema_optimization,
            query_validation: cfg.performance.query_validation,
            timeout_seconds: cfg.generation.timeout_seconds,
            params: cfg.generation.params(),
        }
    }
}

/// Sequences the pipeline: cache check, schema filtering, example
/// selection, prompt build, model call, cleanup, validation, cache store.
///
/// All collaborators are injected at construction; there is no global
/// state. Expected failures (bad model output, generation errors,
/// timeouts) come back as `-- Error` strings, cached under the same key as
/// a success would be, so repeated identical failing requests do not
/// re-invoke the model.
pub struct SqlGenerator {
    model: Arc<dyn SqlModel>,
    /// The loaded model is a single shared resource; one generation in
    /// flight at a time.
    model_gate: tokio::sync::Mutex<()>,
    cache: ResultCache,
    examples: ExampleStore,
    strategy: SelectionStrategy,
    opts: GeneratorOptions,
}

impl SqlGenerator {
    pub fn new(
        model: Arc<dyn SqlModel>,
        cache: ResultCache,
        examples: ExampleStore,
        strategy: SelectionStrategy,
        opts: GeneratorOptions,
    ) -> Self {
        Self {
            model,
            model_gate: tokio::sync::Mutex::new(()),
            cache,
            examples,
            strategy,
            opts,
        }
    }

    /// Wire up a generator from configuration, with a seeded example store
    /// and capability negotiation for the selection strategy.
    pub fn from_config(
        cfg: &AppConfig,
        model: Arc<dyn SqlModel>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Self {
        let strategy =
            SelectionStrategy::negotiate(cfg.few_shot.use_semantic_similarity, embedder);
        Self::new(
            model,
            ResultCache::new(cfg.cache.max_size, cfg.cache.enabled),
            ExampleStore::seeded(),
            strategy,
            GeneratorOptions::from_config(cfg),
        )
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn examples(&self) -> &ExampleStore {
        &self.examples
    }

    /// Generate SQL for a question against structured schema metadata.
    /// This is the preferred entry point: filtering happens on tables, not
    /// on DDL text.
    ///
    /// Always returns a string: validated SQL ending in `;`, or an
    /// `-- Error` annotated result.
    pub async fn generate_for_tables(&self, question: &str, tables: &[SchemaTable]) -> String {
        let schema_ddl = schema::render_ddl(tables);
        if let Some(hit) = self.cache.get(question, &schema_ddl) {
            info!("cache hit for question");
            return hit;
        }

        let schema_for_prompt = if self.opts.schema_optimization {
            schema::render_ddl(&schema::filter_tables(tables, question))
        } else {
            schema_ddl.clone()
        };

        self.run_miss(question, &schema_ddl, &schema_for_prompt).await
    }

    /// Legacy adapter for callers that only have schema text. The cache key
    /// is the text exactly as given; filtering falls back to DDL boundary
    /// detection.
    pub async fn generate(&self, question: &str, schema_ddl: &str) -> String {
        if let Some(hit) = self.cache.get(question, schema_ddl) {
            info!("cache hit for question");
            return hit;
        }

        let schema_for_prompt = if self.opts.schema_optimization {
            schema::filter_ddl_text(schema_ddl, question)
        } else {
            schema_ddl.to_string()
        };

        self.run_miss(question, schema_ddl, &schema_for_prompt).await
    }

    async fn run_miss(&self, question: &str, schema_ddl: &str, schema_for_prompt: &str) -> String {
        let prompt = if self.opts.few_shot_enabled {
            let selected = self
                .strategy
                .select(question, &self.examples.all(), self.opts.num_examples)
                .await;
            info!(examples = selected.len(), "using few-shot prompting");
            prompt::few_shot_prompt(schema_for_prompt, question, &selected)
        } else {
            info!("using standard prompting");
            prompt::standard_prompt(schema_for_prompt, question)
        };

        let raw = match self.call_model(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("generation failed: {e}");
                let annotated = format!("{ERROR_PREFIX}: generating SQL failed: {e}");
                self.cache.set(question, schema_ddl, &annotated);
                return annotated;
            }
        };

        let sql = anchor_select(&raw);

        let result = if self.opts.query_validation {
            match validate::validate(&sql) {
                Validation::Valid(clean) => clean,
                Validation::Invalid(reason) => {
                    warn!(%reason, "generated SQL failed validation");
                    format!("{ERROR_PREFIX}: {reason}\n{sql}")
                }
            }
        } else {
            sql
        };

        self.cache.set(question, schema_ddl, &result);
        result
    }

    async fn call_model(&self, prompt: &str) -> anyhow::Result<String> {
        let _gate = self.model_gate.lock().await;
        let completion = self.model.complete(prompt, &self.opts.params);
        match timeout(Duration::from_secs(self.opts.timeout_seconds), completion).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!(
                "generation timed out after {}s",
                self.opts.timeout_seconds
            ),
        }
    }
}

/// The prompt ends with a SELECT opener the model is meant to continue, so
/// its raw output usually lacks the keyword. Re-anchor on the last SELECT
/// the model emitted, or prepend the opener.
fn anchor_select(raw: &str) -> String {
    match raw.rfind("SELECT") {
        Some(idx) => raw[idx..].to_string(),
        None => format!("SELECT {}", raw.trim_start()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_prepends_opener_to_plain_continuation() {
        assert_eq!(
            anchor_select("COUNT(*) FROM employees"),
            "SELECT COUNT(*) FROM employees"
        );
    }

    #[test]
    fn anchor_keeps_last_select_of_echoed_output() {
        let raw = "-- Question: x\nSELECT 1 FROM a;\n\nSELECT 2 FROM b;";
        assert_eq!(anchor_select(raw), "SELECT 2 FROM b;");
    }
}
