mod display;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use contractlens_ai::{AnalysisEngine, OpenAiGenerator, TextGenerator};
use contractlens_server::{ContractLensServer, Environment, Pipeline, ServerConfig, check_databases};
use contractlens_store::{ContractSource, PartSource, RestPartStore, RetrievalScope, VectorContractStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contractlens", version, about = "Supplier contract analysis for part numbers")]
struct Cli {
    /// Log level used when RUST_LOG is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    sources: Sources,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Sources {
    /// PostgREST (Supabase) project URL for the part master file.
    #[arg(long, env = "SUPABASE_URL", global = true)]
    supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true, global = true)]
    supabase_key: Option<String>,

    #[arg(long, env = "MASTER_TABLE", default_value = contractlens_store::rest::DEFAULT_TABLE, global = true)]
    master_table: String,

    /// Local Parquet/CSV snapshot of the master file, used instead of PostgREST.
    #[cfg(feature = "duckdb")]
    #[arg(long, env = "MASTER_FILE_PATH", global = true)]
    master_file: Option<std::path::PathBuf>,

    #[arg(long, env = "ASTRA_DB_ENDPOINT", global = true)]
    astra_endpoint: Option<String>,

    #[arg(long, env = "ASTRA_DB_KEYSPACE", default_value = "default_keyspace", global = true)]
    astra_keyspace: String,

    #[arg(long, env = "ASTRA_DB_COLLECTION", global = true)]
    astra_collection: Option<String>,

    #[arg(long, env = "ASTRA_DB_TOKEN", hide_env_values = true, global = true)]
    astra_token: Option<String>,

    /// Document field holding the supplier name; adds an equality filter to retrieval.
    #[arg(long, env = "ASTRA_SUPPLIER_FIELD", global = true)]
    astra_supplier_field: Option<String>,

    /// Retrieve the first page of the collection without supplier ranking.
    #[arg(long, env = "ASTRA_UNSCOPED", global = true)]
    unscoped_retrieval: bool,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = contractlens_ai::generator::DEFAULT_BASE_URL, global = true)]
    openai_base_url: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = contractlens_ai::generator::DEFAULT_MODEL, global = true)]
    openai_model: String,

    #[arg(long, env = "GENERATION_TIMEOUT_SECS", default_value_t = 60, global = true)]
    generation_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "HOST", default_value = contractlens_server::config::DEFAULT_HOST)]
        host: String,
        #[arg(long, env = "PORT", default_value_t = contractlens_server::config::DEFAULT_PORT)]
        port: u16,
        #[arg(long = "env", env = "APP_ENV", default_value = "development")]
        environment: Environment,
        /// Comma-separated allowed origins; `*` allows any.
        #[arg(long, env = "CORS_ORIGINS")]
        cors_origins: Option<String>,
        /// Per-client rate-limit window in milliseconds.
        #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = contractlens_server::config::DEFAULT_RATE_LIMIT_WINDOW_MS)]
        rate_limit_window_ms: u64,
        /// Requests allowed per client per window.
        #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = contractlens_server::config::DEFAULT_RATE_LIMIT_MAX_REQUESTS)]
        rate_limit_max_requests: u32,
    },
    /// Analyse one part number and print the result.
    Analyze {
        part_number: String,
        /// Print the raw JSON payload instead of a card.
        #[arg(long)]
        json: bool,
    },
    /// Check connectivity to the master file, vector store and (optionally) the model.
    Health {
        #[arg(long)]
        with_model: bool,
    },
    /// List contract documents, for a supplier or unscoped.
    Contracts {
        supplier: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Summarise a supplier's parts in the master file.
    Supplier { name: String },
}

impl Sources {
    fn part_source(&self) -> anyhow::Result<Arc<dyn PartSource>> {
        #[cfg(feature = "duckdb")]
        if let Some(path) = &self.master_file {
            let store = contractlens_store::DuckPartStore::open()?;
            store
                .load_master_file(path)
                .with_context(|| format!("loading master file {}", path.display()))?;
            return Ok(Arc::new(store));
        }

        let url = self.supabase_url.clone().context("SUPABASE_URL is not set")?;
        let key = self.supabase_key.clone().context("SUPABASE_ANON_KEY is not set")?;
        let store = RestPartStore::new(url, key)?.with_table(self.master_table.clone());
        Ok(Arc::new(store))
    }

    fn contract_source(&self) -> anyhow::Result<Arc<dyn ContractSource>> {
        let endpoint = self.astra_endpoint.as_deref().context("ASTRA_DB_ENDPOINT is not set")?;
        let collection = self
            .astra_collection
            .as_deref()
            .context("ASTRA_DB_COLLECTION is not set")?;
        let token = self.astra_token.clone().context("ASTRA_DB_TOKEN is not set")?;

        let scope = if self.unscoped_retrieval {
            RetrievalScope::Unscoped
        } else {
            RetrievalScope::Semantic {
                filter_field: self.astra_supplier_field.clone(),
            }
        };
        let store = VectorContractStore::new(endpoint, &self.astra_keyspace, collection, token)?
            .with_scope(scope);
        Ok(Arc::new(store))
    }

    fn generator(&self) -> anyhow::Result<Arc<dyn TextGenerator>> {
        let key = self.openai_api_key.clone().context("OPENAI_API_KEY is not set")?;
        let generator = OpenAiGenerator::new(key)?
            .with_base_url(self.openai_base_url.clone())
            .with_model(self.openai_model.clone())
            .with_timeout(Duration::from_secs(self.generation_timeout_secs));
        Ok(Arc::new(generator))
    }

    fn pipeline(&self) -> anyhow::Result<Pipeline> {
        Ok(Pipeline::new(
            self.part_source()?,
            self.contract_source()?,
            AnalysisEngine::new(self.generator()?),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so env fallbacks see it.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("warning: failed to read .env: {e}");
    }

    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    tracing::debug!("contractlens v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve {
            host,
            port,
            environment,
            cors_origins,
            rate_limit_window_ms,
            rate_limit_max_requests,
        } => {
            let mut config = ServerConfig {
                host,
                port,
                environment,
                log_level: cli.log_level.clone(),
                rate_limit_window_ms,
                rate_limit_max_requests,
                ..Default::default()
            };
            if let Some(origins) = cors_origins {
                config.cors_origins = ServerConfig::parse_origins(&origins);
            }
            let pipeline = Arc::new(cli.sources.pipeline()?);
            let server = ContractLensServer::new(config, pipeline)?;
            server.start().await?;
        }
        Command::Analyze { part_number, json } => {
            let pipeline = cli.sources.pipeline()?;
            let analysis = pipeline
                .analyze_contract(&part_number)
                .await
                .with_context(|| format!("analysing {part_number}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis.result)?);
            } else {
                display::print_analysis_card(&analysis);
            }
        }
        Command::Health { with_model } => {
            let parts = cli.sources.part_source()?;
            let contracts = cli.sources.contract_source()?;
            let databases = check_databases(parts.as_ref(), contracts.as_ref()).await;

            let model = if with_model {
                let generator = cli.sources.generator()?;
                let outcome = generator.ping().await.map_err(|e| e.to_string());
                Some((cli.sources.openai_model.clone(), outcome))
            } else {
                None
            };
            display::print_health(&databases, model.as_ref().map(|(n, o)| (n.as_str(), o.clone())));
            if !databases.all_connected() {
                bail!("one or more dependencies are unreachable");
            }
        }
        Command::Contracts {
            supplier,
            limit,
            json,
        } => {
            let source = cli.sources.contract_source()?;
            let docs = match &supplier {
                Some(name) => source.find_contracts(name, limit).await,
                None => source.all_contracts(limit).await,
            }
            .context("querying the contract collection")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            } else {
                display::print_contracts(&docs);
            }
        }
        Command::Supplier { name } => {
            let parts = cli.sources.part_source()?;
            match parts.supplier_statistics(&name).await? {
                Some(stats) => display::print_supplier_statistics(&stats),
                None => println!("No parts found for supplier matching \"{name}\"."),
            }
        }
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
