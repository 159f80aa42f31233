use crate::model::SchemaTable;
use std::collections::BTreeSet;
use tracing::debug;

/// Source of the current database schema.
pub trait SchemaProvider {
    fn schema(&self) -> anyhow::Result<Vec<SchemaTable>>;

    fn schema_ddl(&self) -> anyhow::Result<String> {
        Ok(render_ddl(&self.schema()?))
    }
}

pub fn render_table_ddl(table: &SchemaTable) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.data_type))
        .collect::<Vec<_>>()
        .join(",\n  ");
    format!("CREATE TABLE {} (\n  {}\n);", table.name, columns)
}

pub fn render_ddl(tables: &[SchemaTable]) -> String {
    tables
        .iter()
        .map(render_table_ddl)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The primary entity table, included in every filtered schema.
pub const CENTRAL_TABLE: &str = "employees";

/// Trigger keywords per table: a table is relevant when any trigger occurs
/// as a substring of the lowercased question.
const TABLE_TRIGGERS: &[(&str, &[&str])] = &[
    (
        "employees",
        &[
            "employee", "worker", "staff", "person", "name", "first", "last", "gender", "birth",
            "hire",
        ],
    ),
    ("departments", &["department", "dept", "division"]),
    ("salaries", &["salary", "pay", "wage", "income", "earn", "money"]),
    ("titles", &["title", "position", "job", "role"]),
    ("dept_emp", &["department", "work", "assign", "belong"]),
    ("dept_manager", &["manager", "head", "lead", "boss", "manage"]),
];

/// Second pass: relationship terms pull in the junction/relation tables a
/// join over that relationship needs.
const RELATION_TRIGGERS: &[(&str, &[&str])] = &[
    ("department", &["departments", "dept_emp"]),
    ("manager", &["dept_manager"]),
    ("title", &["titles"]),
    ("salary", &["salaries"]),
];

/// Table names judged relevant to a question. Always contains
/// [`CENTRAL_TABLE`].
pub fn relevant_tables(question: &str) -> BTreeSet<String> {
    let question_lower = question.to_lowercase();
    let mut relevant = BTreeSet::new();

    for (table, triggers) in TABLE_TRIGGERS {
        if triggers.iter().any(|kw| question_lower.contains(kw)) {
            relevant.insert((*table).to_string());
        }
    }

    relevant.insert(CENTRAL_TABLE.to_string());

    for (term, tables) in RELATION_TRIGGERS {
        if question_lower.contains(term) {
            for table in *tables {
                relevant.insert((*table).to_string());
            }
        }
    }

    debug!(?relevant, "schema filtered");
    relevant
}

/// Narrow a structured schema to the tables relevant to `question`,
/// preserving table order.
pub fn filter_tables(tables: &[SchemaTable], question: &str) -> Vec<SchemaTable> {
    let relevant = relevant_tables(question);
    tables
        .iter()
        .filter(|t| relevant.contains(&t.name))
        .cloned()
        .collect()
}

fn table_name_from_create(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let prefix = trimmed.get(..12)?;
    if !prefix.eq_ignore_ascii_case("CREATE TABLE") {
        return None;
    }
    let name: String = trimmed[12..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Legacy input adapter for callers that only have DDL text. Table blocks
/// are bounded by a `CREATE TABLE` line and a closing-paren line; blank
/// lines outside blocks are preserved so the formatting survives.
///
/// Prefer [`filter_tables`] on structured metadata.
pub fn filter_ddl_text(schema: &str, question: &str) -> String {
    let relevant = relevant_tables(question);

    let mut filtered: Vec<&str> = Vec::new();
    let mut include = false;
    for line in schema.lines() {
        let stripped = line.trim();

        if let Some(name) = table_name_from_create(line) {
            include = relevant.contains(&name);
        } else if stripped == ");" || stripped == ")" {
            if include {
                filtered.push(line);
            }
            include = false;
            continue;
        }

        if include || stripped.is_empty() {
            filtered.push(line);
        }
    }
    filtered.join("\n")
}

/// Table names appearing in DDL text, in order of appearance.
pub fn extract_table_names(schema: &str) -> Vec<String> {
    schema.lines().filter_map(table_name_from_create).collect()
}
