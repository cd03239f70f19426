//! gridquery CLI - compile and run grid requests against a JSON data file
//!
//! Usage:
//!   gridquery sql    --data <rows.json> --request <req.json> [--config <gridquery.toml>] [--dialect <dialect>]
//!   gridquery rows   --data <rows.json> --request <req.json>
//!   gridquery count  --data <rows.json> --request <req.json>
//!   gridquery values --data <rows.json> --field <field>
//!
//! Examples:
//!   gridquery sql --data sales.json --request group_by_country.json --dialect tsql
//!   gridquery rows --data sales.json --request pivot_by_year.json

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gridquery::config::Settings;
use gridquery::model::{ServerSideGetRowsRequest, Value};
use gridquery::source::MemoryDataSource;
use gridquery::sql::Dialect;
use gridquery::QueryBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridquery")]
#[command(about = "Compile server-side row model requests into SQL and run them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL compiled for a request
    Sql {
        #[command(flatten)]
        common: Common,

        /// Path to the request JSON
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Run a request and print the grid response
    Rows {
        #[command(flatten)]
        common: Common,

        #[arg(short, long)]
        request: PathBuf,
    },

    /// Count the rows or groups a request matches
    Count {
        #[command(flatten)]
        common: Common,

        #[arg(short, long)]
        request: PathBuf,
    },

    /// Print the set filter values of a column
    Values {
        #[command(flatten)]
        common: Common,

        #[arg(short, long)]
        field: String,
    },
}

#[derive(Args)]
struct Common {
    /// Path to the JSON data file
    #[arg(long)]
    data: PathBuf,

    /// Settings file (defaults to GRIDQUERY_CONFIG, ./gridquery.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQL dialect, overrides the settings
    #[arg(short, long)]
    dialect: Option<DialectArg>,
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Duckdb,
    Postgres,
    Tsql,
    Mysql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Mysql => Dialect::MySql,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sql { common, request } => cmd_sql(common, request).await,
        Commands::Rows { common, request } => cmd_rows(common, request).await,
        Commands::Count { common, request } => cmd_count(common, request).await,
        Commands::Values { common, field } => cmd_values(common, field).await,
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

async fn cmd_sql(common: Common, request: PathBuf) -> CliResult<String> {
    let (builder, dialect) = open(&common).await?;
    let request = read_request(&request)?;
    let (query, _) = builder.build_query(&request).await?;
    Ok(query.to_sql(dialect))
}

async fn cmd_rows(common: Common, request: PathBuf) -> CliResult<String> {
    let (builder, _) = open(&common).await?;
    let request = read_request(&request)?;
    let response = builder.get_rows(&request).await?;
    Ok(serde_json::to_string_pretty(&response)?)
}

async fn cmd_count(common: Common, request: PathBuf) -> CliResult<String> {
    let (builder, _) = open(&common).await?;
    let request = read_request(&request)?;
    Ok(builder.count_rows(&request).await?.to_string())
}

async fn cmd_values(common: Common, field: String) -> CliResult<String> {
    let (builder, _) = open(&common).await?;
    let values = builder.supply_set_filter_values(&field).await?;
    let json: Vec<serde_json::Value> = values.iter().map(Value::to_json).collect();
    Ok(serde_json::to_string_pretty(&json)?)
}

async fn open(common: &Common) -> CliResult<(QueryBuilder, Dialect)> {
    let mut settings = match &common.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    if let Some(dialect) = common.dialect.clone() {
        settings.dialect = dialect.into();
    }
    let dialect = settings.dialect;

    let source = MemoryDataSource::from_file(&common.data).await?;
    let table = source.table().to_string();
    let builder = QueryBuilder::builder(Arc::new(source))
        .table(&table)
        .settings(settings)
        .build()?;
    Ok((builder, dialect))
}

fn read_request(path: &Path) -> CliResult<ServerSideGetRowsRequest> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Error reading request '{}': {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}
