use async_trait::async_trait;
use sqlgen_core::cache::ResultCache;
use sqlgen_core::examples::{ExampleStore, SelectionStrategy};
use sqlgen_core::generator::{is_error_result, GeneratorOptions, SqlGenerator};
use sqlgen_core::model::GenerationParams;
use sqlgen_core::providers::llm::SqlModel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

const SCHEMA: &str = "CREATE TABLE employees (\n  emp_no int,\n  first_name varchar(14)\n);";

/// Deterministic model double: canned continuation, call counter, last
/// prompt capture.
struct FakeModel {
    response: String,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl FakeModel {
    fn returning(response: &str) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            delay: None,
        }
    }

    fn slow(response: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(response)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlModel for FakeModel {
    async fn complete(&self, prompt: &str, _params: &GenerationParams) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

fn generator(model: Arc<FakeModel>, opts: GeneratorOptions) -> SqlGenerator {
    SqlGenerator::new(
        model,
        ResultCache::new(10, true),
        ExampleStore::seeded(),
        SelectionStrategy::Keyword,
        opts,
    )
}

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let model = Arc::new(FakeModel::returning(" COUNT(*) FROM employees"));
    let gen = generator(model.clone(), GeneratorOptions::default());

    let first = gen.generate("How many employees are there?", SCHEMA).await;
    let second = gen.generate("How many employees are there?", SCHEMA).await;

    assert_eq!(first, "SELECT COUNT(*) FROM employees;");
    assert_eq!(first, second);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn invalid_output_yields_cached_error_result() {
    let model = Arc::new(FakeModel::returning("sorry, I cannot answer that"));
    let gen = generator(model.clone(), GeneratorOptions::default());

    let first = gen.generate("How many employees are there?", SCHEMA).await;
    assert!(is_error_result(&first));
    assert!(first.contains("FROM clause"));

    // The error result is cached; the model is not re-invoked.
    let second = gen.generate("How many employees are there?", SCHEMA).await;
    assert_eq!(first, second);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn few_shot_prompt_carries_schema_examples_and_question() {
    let model = Arc::new(FakeModel::returning(" COUNT(*) FROM employees"));
    let gen = generator(model.clone(), GeneratorOptions::default());

    gen.generate("How many employees are there in total?", SCHEMA)
        .await;

    let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("CREATE TABLE employees"));
    // The seed store's count example is the obvious match for this question.
    assert!(prompt.contains("SELECT COUNT(*) FROM employees;"));
    assert!(prompt.contains("-- Question: How many employees are there in total?"));
    assert!(prompt.ends_with("\nSELECT"));
}

#[tokio::test]
async fn standard_prompt_used_when_few_shot_disabled() {
    let model = Arc::new(FakeModel::returning(" COUNT(*) FROM employees"));
    let opts = GeneratorOptions {
        few_shot_enabled: false,
        ..GeneratorOptions::default()
    };
    let gen = generator(model.clone(), opts);

    gen.generate("How many employees are there?", SCHEMA).await;

    let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
    assert!(!prompt.contains("example questions"));
    assert!(prompt.ends_with("\nSELECT"));
}

#[tokio::test]
async fn schema_optimization_trims_unmentioned_tables() {
    let schema = format!("{SCHEMA}\n\nCREATE TABLE departments (\n  dept_no char(4)\n);");
    let model = Arc::new(FakeModel::returning(" COUNT(*) FROM employees"));
    let gen = generator(model.clone(), GeneratorOptions::default());

    gen.generate("How many people were hired in 2001?", &schema)
        .await;

    let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("CREATE TABLE employees"));
    assert!(!prompt.contains("CREATE TABLE departments"));
}

#[tokio::test]
async fn validation_disabled_passes_raw_anchored_output() {
    let model = Arc::new(FakeModel::returning(" COUNT(*) FROM employees"));
    let opts = GeneratorOptions {
        query_validation: false,
        ..GeneratorOptions::default()
    };
    let gen = generator(model, opts);

    let out = gen.generate("How many employees are there?", SCHEMA).await;
    // No terminator appended without the validation step.
    assert_eq!(out, "SELECT COUNT(*) FROM employees");
}

#[tokio::test]
async fn structured_schema_path_filters_tables_and_caches() {
    use sqlgen_core::model::{SchemaColumn, SchemaTable};

    let table = |name: &str, col: &str| SchemaTable {
        name: name.into(),
        columns: vec![SchemaColumn {
            name: col.into(),
            data_type: "int".into(),
        }],
    };
    let tables = vec![table("employees", "emp_no"), table("departments", "dept_no")];

    let model = Arc::new(FakeModel::returning(" COUNT(*) FROM employees"));
    let gen = generator(model.clone(), GeneratorOptions::default());

    let first = gen
        .generate_for_tables("How many people were hired in 2001?", &tables)
        .await;
    let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("CREATE TABLE employees"));
    assert!(!prompt.contains("CREATE TABLE departments"));

    // The cache key is the rendered full schema, not the filtered one.
    let second = gen
        .generate_for_tables("How many people were hired in 2001?", &tables)
        .await;
    assert_eq!(first, second);
    assert_eq!(model.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_generation_becomes_cached_error() {
    let model = Arc::new(FakeModel::slow(
        " COUNT(*) FROM employees",
        Duration::from_secs(120),
    ));
    let opts = GeneratorOptions {
        timeout_seconds: 1,
        ..GeneratorOptions::default()
    };
    let gen = generator(model.clone(), opts);

    let out = gen.generate("How many employees are there?", SCHEMA).await;
    assert!(is_error_result(&out));
    assert!(out.contains("timed out"));

    let again = gen.generate("How many employees are there?", SCHEMA).await;
    assert_eq!(out, again);
    assert_eq!(model.calls(), 1);
}
