use crate::model::Example;
use crate::providers::embedder::{cosine_similarity, Embedder};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

fn example(question: &str, sql: &str, keywords: &[&str]) -> Example {
    Example {
        question: question.into(),
        sql: sql.into(),
        keywords: keywords.iter().map(|k| (*k).into()).collect(),
    }
}

/// Built-in few-shot examples for the employee database.
pub fn seed_examples() -> Vec<Example> {
    vec![
        example(
            "How many employees are there in total?",
            "SELECT COUNT(*) FROM employees;",
            &["count", "total", "employees", "how many"],
        ),
        example(
            "List all departments",
            "SELECT dept_name FROM departments;",
            &["list", "departments", "all departments"],
        ),
        example(
            "Find employees in the Sales department",
            "SELECT e.first_name, e.last_name FROM employees e JOIN dept_emp de ON e.emp_no = de.emp_no JOIN departments d ON de.dept_no = d.dept_no WHERE d.dept_name = 'Sales';",
            &["sales", "department", "employees in"],
        ),
        example(
            "What is the average salary by department?",
            "SELECT d.dept_name, AVG(s.salary) as avg_salary FROM departments d JOIN dept_emp de ON d.dept_no = de.dept_no JOIN salaries s ON de.emp_no = s.emp_no GROUP BY d.dept_name;",
            &["average", "salary", "department", "group by"],
        ),
        example(
            "Find the highest paid employee",
            "SELECT e.first_name, e.last_name, s.salary FROM employees e JOIN salaries s ON e.emp_no = s.emp_no ORDER BY s.salary DESC LIMIT 1;",
            &["highest", "paid", "maximum", "salary", "top"],
        ),
        example(
            "Show employees hired after 2000",
            "SELECT first_name, last_name, hire_date FROM employees WHERE hire_date > '2000-01-01';",
            &["hired", "after", "date", "2000"],
        ),
        example(
            "Count employees by gender",
            "SELECT gender, COUNT(*) as count FROM employees GROUP BY gender;",
            &["count", "gender", "group by"],
        ),
        example(
            "Find all managers",
            "SELECT DISTINCT e.first_name, e.last_name FROM employees e JOIN dept_manager dm ON e.emp_no = dm.emp_no;",
            &["managers", "manager", "distinct"],
        ),
    ]
}

/// Shared, append-only list of few-shot examples. Seeded once at startup;
/// grows via explicit user addition, never auto-removed.
#[derive(Clone)]
pub struct ExampleStore {
    inner: Arc<Mutex<Vec<Example>>>,
}

impl ExampleStore {
    pub fn new(examples: Vec<Example>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(examples)),
        }
    }

    pub fn seeded() -> Self {
        Self::new(seed_examples())
    }

    pub fn append(&self, example: Example) {
        let mut inner = self.inner.lock().unwrap();
        inner.push(example);
        info!(total = inner.len(), "added custom example");
    }

    /// Snapshot of the current examples, in insertion order.
    pub fn all(&self) -> Vec<Example> {
        self.inner.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rank examples by keyword relevance and take the top `k`.
///
/// Score is 2 per stored keyword appearing as a substring of the lowercased
/// question, plus the number of words the two questions share. The sort is
/// stable, so ties keep insertion order.
pub fn select_by_keywords(question: &str, examples: &[Example], k: usize) -> Vec<Example> {
    let question_lower = question.to_lowercase();
    let question_words: HashSet<&str> = question_lower.split_whitespace().collect();

    let mut scored: Vec<(usize, &Example)> = examples
        .iter()
        .map(|ex| {
            let mut score = 0usize;
            for keyword in &ex.keywords {
                if question_lower.contains(&keyword.to_lowercase()) {
                    score += 2;
                }
            }
            let example_lower = ex.question.to_lowercase();
            let example_words: HashSet<&str> = example_lower.split_whitespace().collect();
            score += question_words.intersection(&example_words).count();
            (score, ex)
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    let selected: Vec<Example> = scored
        .into_iter()
        .take(k)
        .map(|(_, ex)| ex.clone())
        .collect();
    info!(count = selected.len(), "selected examples for question");
    selected
}

async fn select_by_similarity(
    embedder: &dyn Embedder,
    question: &str,
    examples: &[Example],
    k: usize,
) -> anyhow::Result<Vec<Example>> {
    let q = embedder.embed(question).await?;
    let mut scored: Vec<(f64, usize)> = Vec::with_capacity(examples.len());
    for (idx, ex) in examples.iter().enumerate() {
        let v = embedder.embed(&ex.question).await?;
        scored.push((cosine_similarity(&q, &v)?, idx));
    }
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scored
        .into_iter()
        .take(k)
        .map(|(_, idx)| examples[idx].clone())
        .collect())
}

/// How examples are ranked. Fixed at construction: when semantic selection
/// is requested but no embedder is wired in, we negotiate down to keyword
/// matching once instead of re-checking per request.
#[derive(Clone)]
pub enum SelectionStrategy {
    Keyword,
    Semantic(Arc<dyn Embedder>),
}

impl SelectionStrategy {
    pub fn negotiate(use_semantic: bool, embedder: Option<Arc<dyn Embedder>>) -> Self {
        match (use_semantic, embedder) {
            (true, Some(e)) => {
                info!(embedder = e.embedder_name(), "using semantic example selection");
                SelectionStrategy::Semantic(e)
            }
            (true, None) => {
                warn!("semantic similarity requested but no embedder available, falling back to keyword matching");
                SelectionStrategy::Keyword
            }
            (false, _) => SelectionStrategy::Keyword,
        }
    }

    pub async fn select(&self, question: &str, examples: &[Example], k: usize) -> Vec<Example> {
        match self {
            SelectionStrategy::Keyword => select_by_keywords(question, examples, k),
            SelectionStrategy::Semantic(embedder) => {
                match select_by_similarity(embedder.as_ref(), question, examples, k).await {
                    Ok(selected) => selected,
                    Err(e) => {
                        warn!("semantic selection failed ({e}), falling back to keyword matching");
                        select_by_keywords(question, examples, k)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[test]
    fn empty_store_returns_empty_selection() {
        assert!(select_by_keywords("how many employees", &[], 3).is_empty());
    }

    #[test]
    fn keyword_hits_outrank_word_overlap() {
        let examples = vec![
            example("List all departments", "SELECT 1 FROM departments;", &["list"]),
            example(
                "What is the average salary by department?",
                "SELECT 2 FROM salaries;",
                &["average", "salary"],
            ),
        ];
        let selected = select_by_keywords("show me the average salary", &examples, 1);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].sql, "SELECT 2 FROM salaries;");
    }

    #[test]
    fn ties_keep_insertion_order() {
        let examples = vec![
            example("alpha one", "SELECT a FROM t;", &["zzz"]),
            example("alpha two", "SELECT b FROM t;", &["zzz"]),
        ];
        // Both score 1 via the shared word "alpha".
        let selected = select_by_keywords("alpha question", &examples, 2);
        assert_eq!(selected[0].sql, "SELECT a FROM t;");
        assert_eq!(selected[1].sql, "SELECT b FROM t;");
    }

    #[test]
    fn top_k_limits_result() {
        let store = ExampleStore::seeded();
        let selected = select_by_keywords("count employees", &store.all(), 3);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn append_grows_store() {
        let store = ExampleStore::new(vec![]);
        assert!(store.is_empty());
        store.append(example("q", "SELECT x FROM y;", &["q"]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn negotiate_falls_back_without_embedder() {
        let strategy = SelectionStrategy::negotiate(true, None);
        assert!(matches!(strategy, SelectionStrategy::Keyword));
    }

    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            // Maps "x"-questions near the x axis and everything else near y.
            if text.contains('x') {
                Ok(vec![1.0, 0.1])
            } else {
                Ok(vec![0.1, 1.0])
            }
        }

        fn embedder_name(&self) -> &'static str {
            "axis"
        }
    }

    #[tokio::test]
    async fn semantic_strategy_ranks_by_similarity() {
        let examples = vec![
            example("about y things", "SELECT y FROM t;", &[]),
            example("about x things", "SELECT x FROM t;", &[]),
        ];
        let strategy = SelectionStrategy::negotiate(true, Some(Arc::new(AxisEmbedder)));
        let selected = strategy.select("x please", &examples, 1).await;
        assert_eq!(selected[0].sql, "SELECT x FROM t;");
    }
}
