use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use project::{ProjectDb, ProjectStore};
use std::path::{Path, PathBuf};
use timeline::{Project, ProjectId};
use tracing::{info, warn};

mod simulate;

use simulate::Event;

#[derive(Parser)]
#[command(name = "branchline")]
#[command(about = "Branchline CLI - Headless tooling for interactive video projects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file (defaults to the per-user data directory)
    #[arg(long, global = true, env = "STUDIO_DATABASE")]
    database: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    InitDb,

    /// Add a login account
    CreateUser {
        username: String,

        #[arg(long, env = "BRANCHLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List stored projects
    List,

    /// Store a project JSON file, replacing any project with the same id
    Import {
        file: PathBuf,

        /// Override the project name
        #[arg(long)]
        name: Option<String>,

        /// Store even when validation finds problems
        #[arg(long)]
        force: bool,
    },

    /// Write a stored project to a JSON file
    Export { id: String, file: PathBuf },

    /// Check a project JSON file for dangling references
    Validate { file: PathBuf },

    /// Simulate playback and print each transition
    Play {
        /// Project JSON file
        #[arg(long, conflicts_with_all = ["server", "project"])]
        file: Option<PathBuf>,

        /// Studio server base URL, used with --project
        #[arg(long, requires = "project")]
        server: Option<String>,

        /// Project id served by the embed endpoint
        #[arg(long, requires = "server")]
        project: Option<String>,

        /// Scripted inputs: end, stream-error, click:<button id or label>
        #[arg(long = "event")]
        events: Vec<Event>,

        /// Transition limit when no events are given
        #[arg(long, default_value_t = 20)]
        max_steps: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let db_path = cli.database.unwrap_or_else(project::default_db_path);

    match cli.command {
        Commands::InitDb => {
            ProjectDb::open_or_create(&db_path)?;
            info!("Database ready: {:?}", db_path);
        }
        Commands::CreateUser { username, password } => {
            let db = ProjectDb::open_or_create(&db_path)?;
            let user = db.create_user(&username, &password)?;
            info!("Created user {} ({})", user.username, user.id);
        }
        Commands::List => list_command(&db_path)?,
        Commands::Import { file, name, force } => import_command(&db_path, &file, name, force)?,
        Commands::Export { id, file } => export_command(&db_path, &id, &file)?,
        Commands::Validate { file } => {
            let project = read_project(&file)?;
            if !report_issues(&project) {
                bail!("{} has validation problems", file.display());
            }
            println!("{}: ok ({} nodes)", file.display(), project.videos.len());
        }
        Commands::Play {
            file,
            server,
            project,
            events,
            max_steps,
        } => {
            let project = match (file, server, project) {
                (Some(file), _, _) => read_project(&file)?,
                (None, Some(server), Some(id)) => fetch_embed(&server, &id).await?,
                _ => bail!("pass --file, or --server together with --project"),
            };
            for line in simulate::run(project, &events, max_steps)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn read_project(file: &Path) -> Result<Project> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    Project::from_json(&raw).with_context(|| format!("parsing {}", file.display()))
}

/// Prints validation problems; true when there were none.
fn report_issues(project: &Project) -> bool {
    let issues = project.validate();
    for issue in &issues {
        warn!("{}", issue);
    }
    issues.is_empty()
}

fn list_command(db_path: &Path) -> Result<()> {
    let db = ProjectDb::open_or_create(db_path)?;
    let projects = db.list_projects()?;
    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    for p in projects {
        println!(
            "{}  {:<32}  updated {}",
            p.id,
            p.name,
            p.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn import_command(db_path: &Path, file: &Path, name: Option<String>, force: bool) -> Result<()> {
    let mut project = read_project(file)?;
    if let Some(name) = name {
        project.name = name;
    }
    if !report_issues(&project) && !force {
        bail!("refusing to import {}; use --force to store it anyway", file.display());
    }

    let db = ProjectDb::open_or_create(db_path)?;
    db.save_project(&project)?;
    info!("Imported {} as {}", project.name, project.id);
    Ok(())
}

fn export_command(db_path: &Path, id: &str, file: &Path) -> Result<()> {
    let id: ProjectId = id
        .parse()
        .with_context(|| format!("{:?} is not a project id", id))?;
    let db = ProjectDb::open_or_create(db_path)?;
    let project = db.load_project(id)?;
    std::fs::write(file, serde_json::to_string_pretty(&project)?)?;
    info!("Exported {} to {:?}", project.name, file);
    Ok(())
}

/// Player bootstrap: fetches the public embed document.
async fn fetch_embed(server: &str, id: &str) -> Result<Project> {
    let url = format!("{}/api/embed/{}", server.trim_end_matches('/'), id);
    info!("Fetching {}", url);
    let project = reqwest::get(&url)
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()?
        .json::<Project>()
        .await
        .context("embed response is not a project")?;
    Ok(project)
}
