//! CLI binary for the PubMed PDF downloader.
//!
//! Usage: pubmed-pdf download --keyword "NAD Parkinson" -n 10 --open

#[cfg(feature = "cli")]
mod cli {
    use std::path::{Path, PathBuf};

    use clap::{Parser, Subcommand};
    use indicatif::{ProgressBar, ProgressStyle};
    use pubmed_pdf::error::Result;
    use pubmed_pdf::{
        chicago_citation, extract_metadata, mla_citation, parse_min_date, ArticleMetadata,
        ArticleReport, Config, Downloader, EntrezClient, FetchError, RunEvent, RunOutcome,
        SearchQuery,
    };
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::task::JoinHandle;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser)]
    #[command(
        name = "pubmed-pdf",
        about = "Search PubMed and download article PDFs",
        version
    )]
    struct Cli {
        /// Config file (overrides PUBMED_PDF_CONFIG and the default location)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        /// More log output (-v info, -vv debug)
        #[arg(short, long, global = true, action = clap::ArgAction::Count)]
        verbose: u8,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(clap::Args)]
    struct QueryArgs {
        /// Keyword term, passed to PubMed as typed
        #[arg(short, long)]
        keyword: Option<String>,
        /// Author term
        #[arg(short, long)]
        author: Option<String>,
        /// Maximum results (defaults to the configured value)
        #[arg(short = 'n', long)]
        max_results: Option<u32>,
        /// Earliest publication date (YYYY/MM/DD, YYYY-MM-DD or YYYY)
        #[arg(long)]
        min_date: Option<String>,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Search PubMed and download every PDF that can be found
        Download {
            #[command(flatten)]
            query: QueryArgs,
            /// Destination folder (defaults to a name built from the terms)
            #[arg(short, long)]
            folder: Option<PathBuf>,
            /// Articles processed at once
            #[arg(short, long)]
            concurrency: Option<usize>,
            /// Open summary.txt when done
            #[arg(long)]
            open: bool,
        },
        /// List matching articles without downloading
        Search {
            #[command(flatten)]
            query: QueryArgs,
        },
        /// Print both citation styles for PMIDs
        Cite {
            /// PubMed ids
            #[arg(required = true)]
            pmids: Vec<String>,
        },
        /// Show the config file location and effective values
        Config {
            /// Write the effective configuration to the config file
            #[arg(long)]
            init: bool,
        },
    }

    fn init_tracing(verbose: u8) {
        let default_level = match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("pubmed_pdf={}", default_level)));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    fn load_config(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => {
                let config = Config::load_from(path)?.with_env_overrides();
                config.validate()?;
                Ok(config)
            }
            None => Config::load(),
        }
    }

    fn prompt(label: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| FetchError::Config(format!("Failed to read {}: {}", label, e)))
    }

    /// Build the query, asking for terms interactively when none were given.
    fn build_query(args: QueryArgs, config: &Config, interactive: bool) -> Result<SearchQuery> {
        let min_date = parse_min_date(args.min_date.as_deref().unwrap_or(&config.min_date))?;
        let mut query = SearchQuery::new(args.max_results.unwrap_or(config.max_results), min_date)
            .with_keyword(args.keyword.unwrap_or_default())
            .with_author(args.author.unwrap_or_default());

        if interactive && query.keyword.is_none() && query.author.is_none() {
            query = query
                .with_keyword(prompt("Keyword")?)
                .with_author(prompt("Author")?);
        }
        query.validate()?;
        Ok(query)
    }

    fn spawn_progress(mut events: UnboundedReceiver<RunEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let bar = ProgressBar::new_spinner();
            while let Some(event) = events.recv().await {
                match event {
                    RunEvent::Searching { term } => {
                        bar.set_message(format!("Searching PubMed for {}", term));
                    }
                    RunEvent::Found { total } => {
                        let style = ProgressStyle::with_template(
                            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg} {eta}",
                        )
                        .map(|s| s.progress_chars("##-"))
                        .unwrap_or_else(|_| ProgressStyle::default_bar());
                        bar.set_style(style);
                        bar.set_length(total as u64);
                        bar.set_position(0);
                    }
                    RunEvent::ArticleStarted { pmid, .. } => {
                        bar.set_message(format!("PMID {}", pmid.as_deref().unwrap_or("?")));
                    }
                    RunEvent::ArticleFinished(report) => {
                        bar.inc(1);
                        bar.set_message(shorten(report.title.as_deref().unwrap_or(""), 40));
                    }
                    RunEvent::Finished { succeeded, total } => {
                        bar.finish_with_message(format!("{}/{} PDFs saved", succeeded, total));
                    }
                }
            }
        })
    }

    fn shorten(text: &str, max: usize) -> String {
        if text.chars().count() > max {
            let cut: String = text.chars().take(max - 3).collect();
            format!("{}...", cut)
        } else {
            text.to_string()
        }
    }

    fn print_outcomes_table(articles: &[ArticleReport]) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["#", "PMID", "Outcome", "Title / Reason"]);

        for article in articles {
            let detail = match &article.outcome {
                pubmed_pdf::ArticleOutcome::Failed { reason }
                | pubmed_pdf::ArticleOutcome::Rejected { reason } => reason.clone(),
                _ => shorten(article.title.as_deref().unwrap_or(""), 60),
            };
            table.add_row(vec![
                (article.index + 1).to_string(),
                article.pmid.clone().unwrap_or_else(|| "-".to_string()),
                article.outcome.label().to_string(),
                detail,
            ]);
        }

        println!("{table}");
    }

    fn print_articles_table(articles: &[ArticleMetadata]) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["PMID", "Year", "First Author", "Title", "PMC", "DOI"]);

        for article in articles {
            let first_author = article
                .authors
                .first()
                .map(|a| a.family_name.as_str())
                .unwrap_or("-");
            table.add_row(vec![
                article.pmid.clone(),
                article.year().to_string(),
                first_author.to_string(),
                shorten(&article.title, 60),
                article.pmc_id.clone().unwrap_or_default(),
                article.doi.clone().unwrap_or_default(),
            ]);
        }

        println!("{table}");
    }

    /// Records that fail validation are reported on stderr and left out.
    fn usable_metadata(records: Vec<pubmed_pdf::ArticleRecord>) -> Vec<ArticleMetadata> {
        records
            .into_iter()
            .filter_map(|record| {
                let pmid = record.pmid.clone();
                match extract_metadata(record) {
                    Ok(metadata) => Some(metadata),
                    Err(e) => {
                        eprintln!("Skipping PMID {}: {}", pmid.as_deref().unwrap_or("?"), e);
                        None
                    }
                }
            })
            .collect()
    }

    fn open_in_viewer(path: &Path) -> Result<()> {
        #[cfg(target_os = "macos")]
        let mut command = std::process::Command::new("open");
        #[cfg(target_os = "windows")]
        let mut command = {
            let mut c = std::process::Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        };
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let mut command = std::process::Command::new("xdg-open");

        command.arg(path).spawn()?;
        Ok(())
    }

    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        init_tracing(cli.verbose);
        let config = load_config(cli.config.as_deref())?;

        match cli.command {
            Commands::Download {
                query,
                folder,
                concurrency,
                open,
            } => {
                let query = build_query(query, &config, true)?;
                let folder = folder.unwrap_or_else(|| Downloader::default_folder(&query));

                let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
                let progress = spawn_progress(rx);
                let downloader = Downloader::new(&config)?
                    .with_concurrency(concurrency.unwrap_or(config.concurrency))
                    .with_events(tx);
                let outcome = downloader.run(&query, &folder).await;
                drop(downloader);
                let _ = progress.await;

                let report = match outcome? {
                    RunOutcome::NoResults => return Err(FetchError::NoResults),
                    RunOutcome::Completed(report) => report,
                };

                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                    OutputFormat::Table => {
                        print_outcomes_table(&report.articles);
                        println!(
                            "{} of {} PDFs in {}",
                            report.succeeded(),
                            report.articles.len(),
                            report.folder.display()
                        );
                        println!("Summary: {}", report.summary_path.display());
                    }
                }

                if open {
                    open_in_viewer(&report.summary_path)?;
                }
            }

            Commands::Search { query } => {
                let query = build_query(query, &config, false)?;
                let client = EntrezClient::new(&config)?;
                let ids = client
                    .search_ids(&query.term()?, query.max_results, query.min_date)
                    .await?;
                if ids.is_empty() {
                    return Err(FetchError::NoResults);
                }
                let articles = usable_metadata(client.fetch_records(&ids).await?);

                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&articles)?),
                    OutputFormat::Table => {
                        println!("Found {} articles:", articles.len());
                        print_articles_table(&articles);
                    }
                }
            }

            Commands::Cite { pmids } => {
                let client = EntrezClient::new(&config)?;
                let articles = usable_metadata(client.fetch_records(&pmids).await?);
                let today = chrono::Local::now().date_naive();

                match cli.output {
                    OutputFormat::Json => {
                        let citations: Vec<_> = articles
                            .iter()
                            .map(|a| {
                                serde_json::json!({
                                    "pmid": a.pmid,
                                    "mla": mla_citation(a, today),
                                    "chicago": chicago_citation(a),
                                })
                            })
                            .collect();
                        println!("{}", serde_json::to_string_pretty(&citations)?);
                    }
                    OutputFormat::Table => {
                        for article in &articles {
                            println!("PMID {}", article.pmid);
                            println!("  MLA:     {}", mla_citation(article, today));
                            println!("  Chicago: {}", chicago_citation(article));
                            println!();
                        }
                    }
                }
            }

            Commands::Config { init } => {
                let path = cli.config.unwrap_or_else(Config::config_path);
                if init {
                    config.save_to(&path)?;
                    println!("Wrote {}", path.display());
                } else {
                    println!("# {}", path.display());
                    let text = toml::to_string_pretty(&config)
                        .map_err(|e| FetchError::Config(e.to_string()))?;
                    println!("{}", text);
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
