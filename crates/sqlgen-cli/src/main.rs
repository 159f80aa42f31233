use clap::{Parser, Subcommand};
use sqlgen_core::config::{self, AppConfig};
use sqlgen_core::db::Database;
use sqlgen_core::generator::{is_error_result, SqlGenerator};
use sqlgen_core::model::Example;
use sqlgen_core::providers::llm::HttpModelClient;
use sqlgen_core::schema::SchemaProvider;
use std::path::PathBuf;
use std::sync::Arc;

mod format;

#[derive(Parser)]
#[command(
    name = "sqlgen",
    version,
    about = "Natural-language to SQL assistant over a fixed relational schema"
)]
struct Cli {
    #[arg(long, global = true, default_value = "sqlgen.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// generate SQL for a question and execute it
    Ask(AskArgs),
    /// print the DDL the model is shown
    Schema,
    /// inspect or extend the few-shot example store
    Examples {
        #[command(subcommand)]
        cmd: ExamplesSub,
    },
    /// write a sample configuration file
    Init(InitArgs),
    /// interactive session; the result cache is in-memory and per-process,
    /// so live statistics and clearing (`:stats`, `:clear`) only exist here
    Repl,
}

#[derive(Parser, Clone)]
struct AskArgs {
    question: String,

    /// generate only, do not run the query
    #[arg(long)]
    no_execute: bool,

    /// force standard prompting for this question
    #[arg(long)]
    no_few_shot: bool,

    /// print the stored few-shot examples afterwards
    #[arg(long)]
    show_examples: bool,
}

#[derive(Subcommand, Clone)]
enum ExamplesSub {
    List,
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        sql: String,
        /// comma-separated trigger keywords
        #[arg(long, default_value = "")]
        keywords: String,
    },
}

#[derive(Parser, Clone)]
struct InitArgs {
    #[arg(long, default_value = "sqlgen.yaml")]
    path: PathBuf,
}

mod exit_codes {
    pub const OK: i32 = 0;
    pub const QUERY_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            exit_codes::CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => {
            config::write_sample_config(&args.path)?;
            println!("wrote sample config to {}", args.path.display());
            Ok(exit_codes::OK)
        }
        Command::Ask(args) => {
            let cfg = config::load_config(&cli.config)?;
            cmd_ask(cfg, args).await
        }
        Command::Schema => {
            let cfg = config::load_config(&cli.config)?;
            let db = startup_checks(&cfg)?;
            println!("{}", db.schema_ddl()?);
            Ok(exit_codes::OK)
        }
        Command::Examples { cmd } => {
            let _cfg = config::load_config(&cli.config)?;
            cmd_examples(cmd)
        }
        Command::Repl => {
            let cfg = config::load_config(&cli.config)?;
            cmd_repl(cfg).await
        }
    }
}

/// Startup health checks: the database must be reachable and the schema
/// readable before any generation is attempted.
fn startup_checks(cfg: &AppConfig) -> anyhow::Result<Database> {
    tracing::info!("performing startup checks");
    let db = Database::open(&cfg.database.path)?;
    let tables = db.tables()?;
    tracing::info!(tables = tables.len(), "database connection successful");
    tracing::info!(
        model = %cfg.model.name,
        few_shot = cfg.few_shot.enabled,
        cache = cfg.cache.enabled,
        schema_optimization = cfg.performance.schema_optimization,
        "effective configuration"
    );
    Ok(db)
}

async fn cmd_ask(mut cfg: AppConfig, args: AskArgs) -> anyhow::Result<i32> {
    if args.no_few_shot {
        cfg.few_shot.enabled = false;
    }

    let db = startup_checks(&cfg)?;
    let tables = db.tables()?;

    let model = Arc::new(HttpModelClient::new(
        cfg.model.endpoint.clone(),
        cfg.model.name.clone(),
    ));
    let generator = SqlGenerator::from_config(&cfg, model, None);

    let sql = generator.generate_for_tables(&args.question, &tables).await;
    println!("{sql}");

    if is_error_result(&sql) {
        eprintln!("query not executed due to errors");
        return Ok(exit_codes::QUERY_ERROR);
    }

    let mut code = exit_codes::OK;
    if !args.no_execute {
        match db.execute(&sql) {
            Ok(rows) => println!("{}", format::format_rows(&rows)),
            Err(e) => {
                println!("Error: {e}");
                code = exit_codes::QUERY_ERROR;
            }
        }
    }

    if args.show_examples {
        print_examples(&generator.examples().all());
    }

    Ok(code)
}

fn cmd_examples(cmd: ExamplesSub) -> anyhow::Result<i32> {
    let store = sqlgen_core::examples::ExampleStore::seeded();
    match cmd {
        ExamplesSub::List => {
            print_examples(&store.all());
        }
        ExamplesSub::Add {
            question,
            sql,
            keywords,
        } => {
            let keywords: Vec<String> = keywords
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            store.append(Example {
                question,
                sql,
                keywords,
            });
            println!("example added ({} total this session)", store.len());
            println!("note: the store is in-memory and per-process; additions only take effect within a repl session");
        }
    }
    Ok(exit_codes::OK)
}

async fn cmd_repl(cfg: AppConfig) -> anyhow::Result<i32> {
    let db = startup_checks(&cfg)?;
    // Fetched once per session, like the schema the examples were written for.
    let tables = db.tables()?;

    let model = Arc::new(HttpModelClient::new(
        cfg.model.endpoint.clone(),
        cfg.model.name.clone(),
    ));
    let generator = SqlGenerator::from_config(&cfg, model, None);

    println!("type a question, or :examples / :stats / :clear / :quit");
    for line in std::io::stdin().lines() {
        let line = line?;
        let input = line.trim();
        match input {
            "" => continue,
            ":quit" | ":q" => break,
            ":examples" => print_examples(&generator.examples().all()),
            ":stats" => {
                println!(
                    "{}",
                    format::format_session_stats(
                        &generator.cache().stats(),
                        generator.examples().len(),
                    )
                );
            }
            ":clear" => {
                generator.cache().clear();
                println!("cache cleared");
            }
            question => {
                let sql = generator.generate_for_tables(question, &tables).await;
                println!("{sql}");
                if is_error_result(&sql) {
                    println!("query not executed due to errors");
                    continue;
                }
                match db.execute(&sql) {
                    Ok(rows) => println!("{}", format::format_rows(&rows)),
                    Err(e) => println!("Error: {e}"),
                }
            }
        }
    }
    Ok(exit_codes::OK)
}

fn print_examples(examples: &[Example]) {
    println!("Available Examples:\n");
    for (i, example) in examples.iter().enumerate() {
        println!("{}. Q: {}", i + 1, example.question);
        println!("   SQL: {}\n", example.sql);
    }
}
