use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tome_core::config::{Config, StorageMode};
use tome_core::provider::create_provider;
use tome_core::rag::{create_vector_store, delete_index, RagIndexer, RagQuery};
use tome_core::user::{SqliteUserRepository, UserService};
use tracing::debug;

#[derive(Parser)]
#[command(name = "tome")]
#[command(about = "Index documents into knowledge bases and build retrieval-augmented prompts", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Configuration commands")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    #[command(about = "Knowledge base commands")]
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },

    #[command(about = "User commands")]
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show,
}

#[derive(Subcommand)]
enum KbCommands {
    #[command(about = "Index a file into a knowledge base, creating it if needed")]
    Index {
        #[arg(help = "Knowledge base name (usually the uploaded file name)")]
        knowledge_base: String,
        file: PathBuf,
        #[arg(short, long, help = "Embedding model (defaults to embedding.model)")]
        model: Option<String>,
    },

    #[command(about = "Delete a knowledge base and its documents")]
    Delete { knowledge_base: String },

    #[command(about = "Print the retrieval-augmented prompt for a question")]
    #[command(group(ArgGroup::new("target").required(true).args(["owner", "knowledge_base"])))]
    Ask {
        question: String,
        #[arg(short, long, help = "User whose uploaded file names the knowledge base")]
        owner: Option<String>,
        #[arg(short, long, help = "Knowledge base to query by name")]
        knowledge_base: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    #[command(about = "Register a new user")]
    Register {
        username: String,
        email: String,
        #[arg(
            short,
            long,
            env = "TOME_PASSWORD",
            hide_env_values = true,
            help = "Password; read from stdin when neither this nor TOME_PASSWORD is set"
        )]
        password: Option<String>,
    },

    #[command(about = "Look up a user by username or email")]
    Find { identifier: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tome_core=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(&config),
        },
        Commands::Kb { command } => match command {
            KbCommands::Index {
                knowledge_base,
                file,
                model,
            } => index_file(&config, &knowledge_base, &file, model.as_deref()).await,
            KbCommands::Delete { knowledge_base } => delete_kb(&config, &knowledge_base).await,
            KbCommands::Ask {
                question,
                owner,
                knowledge_base,
            } => ask(&config, owner.as_deref(), &question, knowledge_base.as_deref()).await,
        },
        Commands::User { command } => {
            let users = user_service(&config).await?;
            match command {
                UserCommands::Register {
                    username,
                    email,
                    password,
                } => {
                    let password = resolve_password(password, std::io::stdin().lock())?;
                    register_user(&users, &username, &email, &password).await
                }
                UserCommands::Find { identifier } => find_user(&users, &identifier).await,
            }
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        debug!(path = %path.display(), "Loading configuration");
        Config::load(path).with_context(|| format!("Failed to load config {}", path.display()))
    } else {
        debug!(path = %path.display(), "No config file, using defaults");
        Ok(Config::default())
    }
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "Embedding:".bold());
    println!("  Provider:   {:?}", config.embedding.provider);
    println!("  Base URL:   {}", config.embedding.base_url);
    println!("  Model:      {}", config.embedding.model.cyan());
    println!("  Dimension:  {}", config.embedding.dimension);
    println!("  API key:    ${}", config.embedding.api_key_env);
    println!();
    println!("{}", "RAG:".bold());
    println!("  Batch Size: {}", config.rag.batch_size);
    println!("  Top K:      {}", config.rag.top_k);
    println!("  Uploads:    {}", config.rag.uploads_dir);
    println!();
    println!("{}", "Storage:".bold());
    match &config.storage.storage_mode {
        StorageMode::Memory => println!("  Mode:       memory"),
        StorageMode::Grpc { url } => println!("  Qdrant:     {}", url),
    }
    println!();
    println!("{}", "Database:".bold());
    println!("  URL:        {}", config.database.url);

    Ok(())
}

async fn index_file(
    config: &Config,
    knowledge_base: &str,
    file: &Path,
    model: Option<&str>,
) -> Result<()> {
    let store = create_vector_store(&config.storage).await?;
    let model = model.unwrap_or(&config.embedding.model);

    let indexer = RagIndexer::new(config, store, knowledge_base, model).await?;
    indexer.index_file(file).await?;

    println!(
        "{} Indexed {} into {}",
        "✓".green().bold(),
        file.display(),
        knowledge_base.cyan()
    );
    Ok(())
}

async fn delete_kb(config: &Config, knowledge_base: &str) -> Result<()> {
    let store = create_vector_store(&config.storage).await?;
    delete_index(store.as_ref(), knowledge_base).await?;

    println!("{} Deleted {}", "✓".green().bold(), knowledge_base.cyan());
    Ok(())
}

async fn ask(
    config: &Config,
    owner: Option<&str>,
    question: &str,
    knowledge_base: Option<&str>,
) -> Result<()> {
    let store = create_vector_store(&config.storage).await?;

    let query = match (knowledge_base, owner) {
        (Some(kb), _) => {
            let provider = create_provider(&config.embedding, &config.embedding.model)?;
            RagQuery::for_knowledge_base(config, store, provider, kb)
        }
        (None, Some(owner)) => RagQuery::new(config, store, owner).await?,
        (None, None) => bail!("either --owner or --knowledge-base is required"),
    };

    let documents = query.retrieve_documents(question).await?;
    eprintln!(
        "{} {} document(s) from {}",
        "→".blue(),
        documents.len(),
        query.knowledge_base().cyan()
    );

    println!("{}", tome_core::rag::build_rag_prompt(question, &documents));
    Ok(())
}

async fn user_service(config: &Config) -> Result<UserService> {
    let repo = SqliteUserRepository::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to open user database")?;
    repo.migrate().await?;
    Ok(UserService::new(Arc::new(repo)))
}

/// Uses the flag or `TOME_PASSWORD` when given, otherwise the first line of `input`.
fn resolve_password(password: Option<String>, mut input: impl BufRead) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password given");
    }
    Ok(password)
}

async fn register_user(users: &UserService, username: &str, email: &str, password: &str) -> Result<()> {
    let user = users.register(username, email, password).await?;
    println!(
        "{} Registered {} (id {})",
        "✓".green().bold(),
        user.username.cyan(),
        user.id
    );
    Ok(())
}

async fn find_user(users: &UserService, identifier: &str) -> Result<()> {
    match users.find_user(identifier).await? {
        Some(user) => {
            println!("{}", "User:".bold());
            println!("  ID:       {}", user.id);
            println!("  Name:     {}", user.name);
            println!("  Username: {}", user.username.cyan());
            println!("  Email:    {}", user.email);
            println!("  Created:  {}", user.created_at);
        }
        None => println!("{} No user matches {}", "✗".red().bold(), identifier),
    }
    Ok(())
}
