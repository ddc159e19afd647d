use std::path::PathBuf;

use arxnews::{
  clients::{ArxivClient, OaiClient},
  database::Database,
  digest::daily_digest,
  harvest::{self, IngestOptions},
  paper::PaperState,
  rank::{filter_by_query, Bm25Ranker},
};
use chrono::{NaiveDate, Utc};
use clap::{builder::ArgAction, Parser, Subcommand};
use console::{style, Emoji};
use errors::ArxnewsdError;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

pub mod errors;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static SATELLITE: Emoji<'_, '_> = Emoji("📡 ", "");
static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

#[derive(Parser)]
#[command(author, version, about = "CLI for the arxnews paper triage system")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the database file
  #[arg(long, short, global = true)]
  path: Option<PathBuf>,

  /// Skip interactive prompts and accept defaults
  #[arg(long, global = true)]
  accept_defaults: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Initialize a new arxnews database
  Init,
  /// Removes the entire database
  Clean,
  /// Pull the recent announcement window from the Atom feed
  Pull {
    /// Categories to pull, comma-separated
    #[arg(long, value_delimiter = ',')]
    categories:  Vec<String>,
    /// Recency window in days
    #[arg(long, default_value_t = 1)]
    days:        i64,
    /// Maximum entries to request per pull
    #[arg(long, default_value_t = 200)]
    max_results: u32,
  },
  /// Run a checkpointed incremental harvest over the OAI-PMH feed
  Harvest {
    /// Categories to harvest, comma-separated
    #[arg(long, value_delimiter = ',')]
    categories:   Vec<String>,
    /// Range in days for a category with no recorded checkpoint
    #[arg(long, default_value_t = 3)]
    default_days: i64,
  },
  /// Fetch one specific paper by arXiv id
  Add {
    /// arXiv identifier, e.g. 2501.01234
    identifier: String,
  },
  /// List stored papers
  List {
    /// Only show papers in this state (triage, shortlist, archived, hidden)
    #[arg(long)]
    state: Option<PaperState>,
    /// Rank and narrow the listing by a free-text query
    #[arg(long)]
    query: Option<String>,
    /// Maximum papers to show
    #[arg(long, default_value_t = 20)]
    top:   usize,
  },
  /// Full-text search over titles and abstracts
  Search {
    /// Search query
    query: String,
  },
  /// Shortlist a paper
  Keep {
    /// arXiv identifier
    identifier: String,
  },
  /// Archive a paper
  Meh {
    /// arXiv identifier
    identifier: String,
  },
  /// Add or remove tags on a paper
  Tag {
    /// arXiv identifier
    identifier: String,
    /// Tags to add
    #[arg(long, value_delimiter = ',')]
    add:        Vec<String>,
    /// Tags to remove
    #[arg(long, value_delimiter = ',')]
    remove:     Vec<String>,
  },
  /// Render the markdown digest for one announcement day
  Digest {
    /// Day to render, YYYY-MM-DD; defaults to today (UTC)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Maximum papers in the digest
    #[arg(long, default_value_t = 10)]
    top:  usize,
  },
  /// Pull and harvest on a fixed interval until interrupted
  Watch {
    /// Minutes between passes
    #[arg(long, default_value_t = 30)]
    interval: u64,
  },
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

/// Resolves the database path from the global flag or the default location.
fn resolve_path(path: Option<PathBuf>) -> PathBuf { path.unwrap_or_else(Database::default_path) }

/// Opens the database at the resolved path.
async fn open_database(path: Option<PathBuf>) -> Result<Database, ArxnewsdError> {
  let path = resolve_path(path);
  trace!("Using database at: {}", path.display());
  Ok(Database::open(&path).await?)
}

/// Builds ingestion options from CLI category overrides.
fn ingest_options(categories: Vec<String>) -> IngestOptions {
  let mut options = IngestOptions::default();
  if !categories.is_empty() {
    options.categories = categories;
  }
  options
}

/// Prints one paper as a numbered listing entry.
fn print_paper(i: usize, paper: &arxnews::paper::Paper) {
  println!("\n{}. {}", style(i + 1).yellow(), style(&paper.title).white().bold());

  let author_display = if paper.authors.is_empty() {
    style("No authors listed").red().italic().to_string()
  } else {
    style(&paper.authors).white().to_string()
  };
  println!("   {} {}", style("Authors:").green(), author_display);

  println!(
    "   {} {} v{} [{}] {}",
    style("Id:").green(),
    style(&paper.arxiv_id).yellow(),
    paper.version,
    style(&paper.primary_category).cyan(),
    style(paper.state).magenta()
  );

  if let Some(announced) = paper.announced_date() {
    println!("   {} {}", style("Announced:").green(), style(announced).white());
  }

  if !paper.tags.is_empty() {
    println!("   {} {}", style("Tags:").green(), style(paper.tags.join(", ")).cyan());
  }

  println!("   {} {}", style("Abs:").green(), style(&paper.link_abs).blue().underlined());

  if !paper.abstract_text.is_empty() {
    println!(
      "   {} {}",
      style("Abstract:").green(),
      style(preview(&paper.abstract_text)).white().italic()
    );
  }
}

/// First 100 characters of an abstract, with an ellipsis when truncated.
fn preview(text: &str) -> String {
  let short = text.chars().take(100).collect::<String>();
  if text.chars().count() > 100 {
    format!("{short}...")
  } else {
    short
  }
}

/// One watch tick: a windowed pull followed by a checkpointed harvest.
///
/// Transient failures are reported and swallowed so the loop keeps running.
async fn watch_tick(db: &Database, options: &IngestOptions) {
  match harvest::ingest_window(db, &ArxivClient::new(), options).await {
    Ok(count) => println!("{} Pulled {} papers", style(SATELLITE).cyan(), style(count).yellow()),
    Err(e) => println!("{} Pull failed: {}", style(WARNING).yellow(), style(e).red()),
  }
  match harvest::ingest_oai(db, &OaiClient::new(), options).await {
    Ok(count) =>
      println!("{} Harvested {} papers", style(SATELLITE).cyan(), style(count).yellow()),
    Err(e) => println!("{} Harvest failed: {}", style(WARNING).yellow(), style(e).red()),
  }
}

#[tokio::main]
async fn main() -> Result<(), ArxnewsdError> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  match cli.command {
    Commands::Init => {
      let path = resolve_path(cli.path);

      if path.exists() {
        println!(
          "{} Database already exists at: {}",
          style(WARNING).yellow(),
          style(path.display()).yellow()
        );

        if !cli.accept_defaults {
          let confirm = dialoguer::Confirm::new()
            .with_prompt(
              "Do you want to reinitialize this database? This will erase all existing data",
            )
            .default(false)
            .interact()?;

          if !confirm {
            println!("{} Keeping existing database", style("ℹ").blue());
            return Ok(());
          }

          // Require typing INIT for final confirmation
          let input = dialoguer::Input::<String>::new()
            .with_prompt(format!(
              "{} Type {} to confirm reinitialization",
              style("⚠️").red(),
              style("INIT").red().bold()
            ))
            .interact_text()?;

          if input != "INIT" {
            println!("{} Operation cancelled, keeping existing database", style("ℹ").blue());
            return Ok(());
          }
        }

        println!("{} Removing existing database", style(WARNING).yellow());
        std::fs::remove_file(&path)?;

        // Also remove any FTS auxiliary files
        let fts_files = glob::glob(&format!("{}*", path.display()))?;
        for file in fts_files.flatten() {
          std::fs::remove_file(file)?;
        }
      }

      // Create parent directories if they don't exist
      if let Some(parent) = path.parent() {
        trace!("Creating parent directories: {}", parent.display());
        std::fs::create_dir_all(parent)?;
      }

      println!(
        "{} Initializing database at: {}",
        style(ROCKET).cyan(),
        style(path.display()).yellow()
      );

      Database::open(&path).await?;

      println!("{} Database initialized successfully!", style(SUCCESS).green());
      Ok(())
    },

    Commands::Clean => {
      let path = resolve_path(cli.path);
      if path.exists() {
        println!(
          "{} Database found at: {}",
          style(WARNING).yellow(),
          style(path.display()).yellow()
        );

        if !cli.accept_defaults {
          if !dialoguer::Confirm::new()
            .with_prompt("Are you sure you want to delete this database?")
            .default(false)
            .wait_for_newline(true)
            .interact()?
          {
            println!("{} Operation cancelled", style("✖").red());
            return Ok(());
          }

          // Require typing DELETE for final confirmation
          let input = dialoguer::Input::<String>::new()
            .with_prompt(format!(
              "{} Type {} to confirm deletion",
              style("⚠️").red(),
              style("DELETE").red().bold()
            ))
            .interact_text()?;

          if input != "DELETE" {
            println!("{} Operation cancelled", style("✖").red());
            return Ok(());
          }
        }

        println!(
          "{} Removing database: {}",
          style(WARNING).yellow(),
          style(path.display()).yellow()
        );
        std::fs::remove_file(&path)?;

        // Also remove any FTS auxiliary files
        let fts_files = glob::glob(&format!("{}*", path.display()))?;
        for file in fts_files.flatten() {
          std::fs::remove_file(file)?;
        }
        println!("{} Database files cleaned", style(SUCCESS).green());
      } else {
        println!(
          "{} No database found at: {}",
          style(WARNING).yellow(),
          style(path.display()).yellow()
        );
      }
      Ok(())
    },

    Commands::Pull { categories, days, max_results } => {
      let db = open_database(cli.path).await?;
      let mut options = ingest_options(categories);
      options.window_days = days;
      options.max_results = max_results;

      println!(
        "{} Pulling last {} day(s) of {}",
        style(SATELLITE).cyan(),
        style(days).yellow(),
        style(options.categories.join(", ")).cyan()
      );

      let count = harvest::ingest_window(&db, &ArxivClient::new(), &options).await?;
      println!("{} Ingested {} papers", style(SAVE).green(), style(count).yellow());
      Ok(())
    },

    Commands::Harvest { categories, default_days } => {
      let db = open_database(cli.path).await?;
      let mut options = ingest_options(categories);
      options.oai_default_days = default_days;

      println!(
        "{} Harvesting {} from last checkpoint",
        style(SATELLITE).cyan(),
        style(options.categories.join(", ")).cyan()
      );

      let count = harvest::ingest_oai(&db, &OaiClient::new(), &options).await?;
      println!("{} Ingested {} papers", style(SAVE).green(), style(count).yellow());
      Ok(())
    },

    Commands::Add { identifier } => {
      let db = open_database(cli.path).await?;

      println!("{} Fetching paper: {}", style(LOOKING_GLASS).cyan(), style(&identifier).yellow());

      let count = harvest::ingest_by_id(&db, &ArxivClient::new(), &identifier).await?;
      if count == 0 {
        println!("{} No paper found for id: {}", style(WARNING).yellow(), style(identifier).yellow());
      } else {
        println!("{} Saved {} record(s)", style(SAVE).green(), style(count).yellow());
      }
      Ok(())
    },

    Commands::List { state, query, top } => {
      let db = open_database(cli.path).await?;

      let mut papers = db.list_papers(state).await?;
      if state.is_none() {
        // Hidden papers never show up unless asked for explicitly.
        papers.retain(|p| p.state != PaperState::Hidden);
      }
      if let Some(query) = &query {
        papers = filter_by_query(&Bm25Ranker, papers, query);
      }
      papers.truncate(top);

      if papers.is_empty() {
        println!("{} No papers to show", style(WARNING).yellow());
      } else {
        println!("{} Showing {} papers:", style(BOOKS).cyan(), style(papers.len()).yellow());
        for (i, paper) in papers.iter().enumerate() {
          debug!("Paper details: {:?}", paper);
          print_paper(i, paper);
        }
      }
      Ok(())
    },

    Commands::Search { query } => {
      let db = open_database(cli.path).await?;

      println!("{} Searching for: {}", style(LOOKING_GLASS).cyan(), style(&query).yellow());

      // Modify query to use FTS5 syntax for better matching
      let search_query = query.split_whitespace().collect::<Vec<_>>().join(" OR ");
      debug!("Modified search query: {}", search_query);

      let papers = db.search_papers(&search_query).await?;
      if papers.is_empty() {
        println!(
          "{} No papers found matching: {}",
          style(WARNING).yellow(),
          style(&query).yellow()
        );
      } else {
        println!("\n{} Found {} papers:", style(SUCCESS).green(), style(papers.len()).yellow());
        for (i, paper) in papers.iter().enumerate() {
          print_paper(i, paper);
        }
      }
      Ok(())
    },

    Commands::Keep { identifier } => {
      let db = open_database(cli.path).await?;
      let count = db.set_state(&identifier, PaperState::Shortlist).await?;
      if count == 0 {
        println!("{} No stored paper with id: {}", style(WARNING).yellow(), style(identifier).yellow());
      } else {
        println!("{} Shortlisted {}", style(SUCCESS).green(), style(identifier).yellow());
      }
      Ok(())
    },

    Commands::Meh { identifier } => {
      let db = open_database(cli.path).await?;
      let count = db.set_state(&identifier, PaperState::Archived).await?;
      if count == 0 {
        println!("{} No stored paper with id: {}", style(WARNING).yellow(), style(identifier).yellow());
      } else {
        println!("{} Archived {}", style(SUCCESS).green(), style(identifier).yellow());
      }
      Ok(())
    },

    Commands::Tag { identifier, add, remove } => {
      let db = open_database(cli.path).await?;
      let tags = db.update_tags(&identifier, &add, &remove).await?;
      if tags.is_empty() {
        println!("{} No tags on {}", style("ℹ").blue(), style(identifier).yellow());
      } else {
        println!(
          "{} Tags on {}: {}",
          style(SUCCESS).green(),
          style(identifier).yellow(),
          style(tags.join(", ")).cyan()
        );
      }
      Ok(())
    },

    Commands::Digest { date, top } => {
      let db = open_database(cli.path).await?;
      let date = date.unwrap_or_else(|| Utc::now().date_naive());

      let papers = db.list_papers(None).await?;
      print!("{}", daily_digest(&papers, date, top));
      Ok(())
    },

    Commands::Watch { interval } => watch(cli.path, interval).await,
  }
}

/// Runs the watch loop: a pull and a harvest every `interval` minutes.
async fn watch(path: Option<PathBuf>, interval: u64) -> Result<(), ArxnewsdError> {
  let db = open_database(path).await?;
  let options = ingest_options(Vec::new());
  let period = std::time::Duration::from_secs(interval * 60);

  println!(
    "{} Watching {} every {} minute(s)",
    style(ROCKET).cyan(),
    style(options.categories.join(", ")).cyan(),
    style(interval).yellow()
  );

  loop {
    watch_tick(&db, &options).await;
    tokio::time::sleep(period).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_preview_counts_chars_not_bytes() {
    // Multibyte text under the limit must not grow an ellipsis.
    let short = "é".repeat(80);
    assert_eq!(preview(&short), short);

    let long = "é".repeat(120);
    let shown = preview(&long);
    assert!(shown.ends_with("..."));
    assert_eq!(shown.chars().count(), 103);
  }

  #[test]
  fn test_preview_short_ascii_unchanged() {
    assert_eq!(preview("We harvest feeds."), "We harvest feeds.");
  }
}
