//! Command-line front end: one subcommand per bundled pipeline.
//!
//! Model settings come from the environment (a `.env` file is loaded first).
//! The result is printed to stdout; logs and error cards go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use structured_extract::{
    log_error_card, log_result_card, render_result, scenarios, setup_logging, ClientConfig,
    ExtractError, ExtractionResult, Fetcher, IssueRef, LLMExtractor, LogConfig,
};

const BLOG_URL: &str =
    "https://blog.pamelafox.org/2024/09/integrating-vision-into-rag-applications.html";
const AGENT_INSTRUCTION: &str = "whats the whistleblower policy for our company";

/// Extract structured data from issues, READMEs, web pages, documents and images.
#[derive(Parser, Debug)]
#[command(name = "extract", version, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "EXTRACT_VERBOSE")]
    verbose: bool,

    /// Also write daily-rolling log files to this directory.
    #[arg(long, global = true, env = "EXTRACT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Print the result as JSON instead of a tree.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a hack submission from a GitHub issue.
    Issue {
        #[arg(long, default_value = "microsoft")]
        owner: String,
        #[arg(long, default_value = "RAG_Hack")]
        repo: String,
        #[arg(long, default_value_t = 159)]
        number: u64,
    },
    /// Fetch and print a GitHub issue. No model is called.
    ShowIssue {
        #[arg(long, default_value = "microsoft")]
        owner: String,
        #[arg(long, default_value = "RAG_Hack")]
        repo: String,
        #[arg(long, default_value_t = 167)]
        number: u64,
    },
    /// Extract a repository overview from its README.
    Repo {
        #[arg(long, default_value = "shank250")]
        owner: String,
        #[arg(long, default_value = "CareerCanvas-msft-raghack")]
        repo: String,
    },
    /// Extract a blog post summary from a web page.
    Webpage {
        #[arg(default_value = BLOG_URL)]
        url: String,
    },
    /// Extract a receipt from a PDF or text document.
    Receipt {
        #[arg(default_value = "example_receipt.pdf")]
        path: PathBuf,
    },
    /// Describe a graph image.
    Graph {
        #[arg(default_value = "example_graph_treecover.png")]
        path: PathBuf,
    },
    /// Extract the plant inventory table from an image.
    Table {
        #[arg(default_value = "example_table_plants.png")]
        path: PathBuf,
    },
    /// Let the model choose between searching and summarizing documents.
    Agent {
        #[arg(default_value = AGENT_INSTRUCTION)]
        instruction: String,
    },
    /// Extract an instance of a schema loaded from a JSON file.
    Custom {
        /// Schema file, e.g. {"name": "Contact", "fields": [{"name": "email", "type": "string"}]}
        #[arg(long)]
        schema: PathBuf,
        /// Input file: an image, a PDF, or a text/markdown document.
        input: PathBuf,
        /// Override the system prompt.
        #[arg(long)]
        system: Option<String>,
    },
}

impl Command {
    /// What the run works on, for the error card.
    fn source(&self) -> String {
        match self {
            Command::Issue { owner, repo, number } | Command::ShowIssue { owner, repo, number } => {
                format!("{owner}/{repo}#{number}")
            }
            Command::Repo { owner, repo } => format!("{owner}/{repo} README.md"),
            Command::Webpage { url } => url.clone(),
            Command::Receipt { path } | Command::Graph { path } | Command::Table { path } => {
                path.display().to_string()
            }
            Command::Agent { instruction } => instruction.clone(),
            Command::Custom { input, .. } => input.display().to_string(),
        }
    }
}

fn extractor() -> Result<LLMExtractor, ExtractError> {
    let provider = ClientConfig::from_env()?.into_provider();
    Ok(LLMExtractor::new(Arc::new(provider)))
}

fn report<T: Serialize>(
    title: &str,
    result: &ExtractionResult<T>,
    json: bool,
) -> Result<String, ExtractError> {
    let value = serde_json::to_value(&result.data)?;
    log_result_card(title, &value, &result.model, result.usage.as_ref());
    if json {
        Ok(serde_json::to_string_pretty(&value)?)
    } else {
        Ok(render_result(title, &value))
    }
}

async fn run(command: &Command, json: bool) -> Result<String, ExtractError> {
    match command {
        Command::ShowIssue { owner, repo, number } => {
            let fetcher = Fetcher::new_github_client()?;
            let issue_ref = IssueRef::new(owner, repo, *number);
            let issue = scenarios::fetch_issue(&fetcher, &issue_ref).await?;
            let value = serde_json::to_value(&issue)?;
            if json {
                Ok(serde_json::to_string_pretty(&value)?)
            } else {
                Ok(render_result("GitHubIssue", &value))
            }
        }
        Command::Issue { owner, repo, number } => {
            let extractor = extractor()?;
            let fetcher = Fetcher::new_github_client()?;
            let issue = IssueRef::new(owner, repo, *number);
            let result = scenarios::hack_submission_from_issue(&fetcher, &extractor, &issue).await?;
            report("HackSubmission", &result, json)
        }
        Command::Repo { owner, repo } => {
            let extractor = extractor()?;
            let fetcher = Fetcher::new_github_client()?;
            let result =
                scenarios::repo_overview_from_readme(&fetcher, &extractor, owner, repo).await?;
            report("RepoOverview", &result, json)
        }
        Command::Webpage { url } => {
            let extractor = extractor()?;
            let fetcher = Fetcher::new();
            let result = scenarios::blog_post_from_page(&fetcher, &extractor, url).await?;
            report("BlogPost", &result, json)
        }
        Command::Receipt { path } => {
            let extractor = extractor()?;
            let result = scenarios::receipt_from_document(&extractor, path).await?;
            report("Receipt", &result, json)
        }
        Command::Graph { path } => {
            let extractor = extractor()?;
            let result = scenarios::graph_from_image(&extractor, path).await?;
            report("Graph", &result, json)
        }
        Command::Table { path } => {
            let extractor = extractor()?;
            let result = scenarios::plant_inventory_from_image(&extractor, path).await?;
            report("PlantInventory", &result, json)
        }
        Command::Agent { instruction } => {
            let extractor = extractor()?;
            let action = scenarios::choose_document_action(&extractor, instruction).await?;
            Ok(action.to_string())
        }
        Command::Custom {
            schema,
            input,
            system,
        } => {
            let extractor = extractor()?;
            let (schema, result) =
                scenarios::custom_extraction(&extractor, schema, input, system.as_deref()).await?;
            report(&schema.name, &result, json)
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig {
        log_dir: cli.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs")),
        log_level: if cli.verbose { "debug" } else { "warn" }.to_string(),
        console_output: true,
        file_output: cli.log_dir.is_some(),
    };
    if let Err(e) = setup_logging(log_config) {
        eprintln!("{e}");
    }

    match run(&cli.command, cli.json).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            e.log();
            log_error_card(&cli.command.source(), &e);
            std::process::exit(1);
        }
    }
}
