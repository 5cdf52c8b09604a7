use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use medreg_client::{ClientConfig, SaveRequest, ServletClient};
use medreg_core::constants::{FILTER_AKAN_NO, FILTER_COUNTRY, FILTER_GOP, FILTER_PATIENT_NAME};
use medreg_core::{
    ChangeKind, ChangeTracker, DeleteReport, GridSession, LogNotifier, Notifier, Row, SaveBatch,
    SaveReport, SearchQuery, SessionConfig, TrackerError,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "medreg")]
#[command(about = "Patient registration grid client")]
struct Cli {
    /// Base URL of the servlet backend
    #[arg(long, global = true, env = "MEDREG_API_BASE_URL")]
    base_url: Option<String>,
    /// Bearer token sent with every request
    #[arg(long, global = true, env = "MEDREG_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Request timeout in milliseconds
    #[arg(long, global = true, env = "MEDREG_TIMEOUT_MS")]
    timeout_ms: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

/// Grid positions to mark, applied in the order inserts, updates, deletes.
#[derive(Args, Debug, Default)]
struct Marks {
    /// Mark the row at POSITION as inserted
    #[arg(long = "insert", value_name = "POSITION")]
    inserts: Vec<usize>,
    /// Mark the row at POSITION as updated
    #[arg(long = "update", value_name = "POSITION")]
    updates: Vec<usize>,
    /// Mark the row at POSITION as deleted
    #[arg(long = "delete", value_name = "POSITION")]
    deletes: Vec<usize>,
}

impl Marks {
    fn entries(&self) -> impl Iterator<Item = (usize, ChangeKind)> + '_ {
        tagged(&self.inserts, ChangeKind::Insert)
            .chain(tagged(&self.updates, ChangeKind::Update))
            .chain(tagged(&self.deletes, ChangeKind::Delete))
    }
}

fn tagged(positions: &[usize], kind: ChangeKind) -> impl Iterator<Item = (usize, ChangeKind)> + '_ {
    positions.iter().map(move |&position| (position, kind))
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the save request the marked rows would produce
    Preview {
        /// JSON array of grid rows
        #[arg(long)]
        rows: PathBuf,
        #[command(flatten)]
        marks: Marks,
    },
    /// Save the marked rows through the servlet
    Submit {
        /// JSON array of grid rows
        #[arg(long)]
        rows: PathBuf,
        #[command(flatten)]
        marks: Marks,
        /// Confirm submitting deletes without asking
        #[arg(long)]
        yes: bool,
    },
    /// Delete rows through the servlet
    Delete {
        /// JSON array of grid rows
        #[arg(long)]
        rows: PathBuf,
        /// Grid position of a row to delete
        #[arg(long = "position", value_name = "POSITION", required = true)]
        positions: Vec<usize>,
        /// Confirm the delete without asking
        #[arg(long)]
        yes: bool,
    },
    /// Search registrations
    Search {
        #[arg(long)]
        akan_no: Option<String>,
        #[arg(long)]
        patient_name: Option<String>,
        #[arg(long)]
        gop: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("medreg=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client_config = || {
        ClientConfig::from_env_values(
            cli.base_url.clone(),
            cli.timeout_ms.clone(),
            cli.token.clone(),
        )
    };

    match &cli.command {
        Commands::Preview { rows, marks } => {
            let rows = load_rows(rows)?;
            println!("{}", preview(&rows, marks)?);
        }
        Commands::Submit { rows, marks, yes } => {
            let rows = load_rows(rows)?;
            let notifier = LogNotifier::new(*yes);
            if !marks.deletes.is_empty()
                && !notifier.confirm(&format!("Submit {} delete(s)?", marks.deletes.len()))
            {
                return Ok(());
            }

            let mut grid = grid_session(client_config()?, notifier)?;
            grid.load(rows);
            for (position, kind) in marks.entries() {
                grid.mark(position, kind)?;
            }

            match grid.save().await? {
                SaveReport::NothingToSave => println!("Nothing to save."),
                SaveReport::Saved {
                    inserted,
                    updated,
                    deleted,
                    message,
                    saved_at,
                } => println!(
                    "Saved at {saved_at}: {inserted} inserted, {updated} updated, {deleted} deleted ({})",
                    message.as_deref().unwrap_or("Success")
                ),
            }
        }
        Commands::Delete {
            rows,
            positions,
            yes,
        } => {
            let rows = load_rows(rows)?;
            let mut grid = grid_session(client_config()?, LogNotifier::new(*yes))?;
            grid.load(rows);

            match grid.delete_rows(positions).await? {
                DeleteReport::NothingSelected => println!("No rows selected."),
                DeleteReport::Cancelled => println!("Delete cancelled."),
                DeleteReport::Deleted { rows, message } => println!(
                    "Deleted {rows} row(s) ({})",
                    message.as_deref().unwrap_or("Success")
                ),
            }
        }
        Commands::Search {
            akan_no,
            patient_name,
            gop,
            country,
        } => {
            let query = [
                (FILTER_AKAN_NO, akan_no),
                (FILTER_PATIENT_NAME, patient_name),
                (FILTER_GOP, gop),
                (FILTER_COUNTRY, country),
            ]
            .into_iter()
            .fold(SearchQuery::new(), |query, (name, value)| match value {
                Some(value) => query.filter(name, value),
                None => query,
            });

            let page = ServletClient::new(client_config()?)?.search(&query).await?;
            println!("{}", serde_json::to_string_pretty(&page.data)?);
            println!(
                "{} of {} row(s), page {} of {}",
                page.data.len(),
                page.total,
                page.page,
                page.total_pages
            );
        }
    }

    Ok(())
}

fn grid_session(
    cfg: ClientConfig,
    notifier: LogNotifier,
) -> anyhow::Result<GridSession<Row, ServletClient, LogNotifier>> {
    tracing::debug!(config = ?cfg, "servlet client configured");
    let client = ServletClient::new(cfg)?;
    // The rows file is the grid; there is no server-side view to reload from.
    let session_cfg = SessionConfig::patient_registration().with_reload_after_save(false);
    Ok(GridSession::new(client, notifier, session_cfg))
}

fn load_rows(path: &Path) -> anyhow::Result<Vec<Row>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rows file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of rows", path.display()))
}

/// Renders the save request body for `rows` with `marks` applied.
fn preview(rows: &[Row], marks: &Marks) -> anyhow::Result<String> {
    let mut tracker = ChangeTracker::new(rows);
    for (position, kind) in marks.entries() {
        if position >= rows.len() {
            return Err(TrackerError::PositionOutOfRange {
                position,
                len: rows.len(),
            }
            .into());
        }
        tracker.mark(position, kind);
    }

    let batch = SaveBatch::new(tracker.changed_rows(rows)?, tracker.changes().clone());
    Ok(serde_json::to_string_pretty(&SaveRequest::from_batch(&batch))?)
}
