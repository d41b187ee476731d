use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use nota_core::JobKind;

/// Command-line arguments for nota
#[derive(Parser, Debug)]
#[command(name = "nota")]
#[command(about = "Annotation task ingestion and export")]
#[command(version)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "NOTA_CONFIG", default_value = "nota.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a task template from a JSON file
    CreateTemplate {
        #[arg(long)]
        file: PathBuf,
    },

    /// Create a task from a JSON file
    CreateTask {
        #[arg(long)]
        file: PathBuf,
    },

    /// Pull media items into a task
    Ingest {
        task: i64,

        /// Only add media items not yet attached to the task
        #[arg(long)]
        refresh: bool,
    },

    /// Export done items of a task as a tar.gz archive
    Export {
        task: i64,

        /// Only items updated after this instant (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Only items updated at or before this instant (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Skip items whose assignment is not done
        #[arg(long)]
        completed_assignments_only: bool,

        /// Archive name (without .tar.gz)
        #[arg(long)]
        name: Option<String>,
    },

    /// List the tasks of a project with item counts
    Tasks { project: i64 },

    /// Show the most recent jobs of a task
    Jobs {
        task: i64,

        #[arg(long, value_enum, default_value_t = JobKindArg::Fetch)]
        kind: JobKindArg,
    },

    /// Refresh and export every task flagged for scheduled runs
    RunScheduled,

    /// Soft-delete a task
    Delete {
        task: i64,

        /// User performing the deletion
        #[arg(long)]
        user: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKindArg {
    Fetch,
    Export,
}

impl From<JobKindArg> for JobKind {
    fn from(kind: JobKindArg) -> Self {
        match kind {
            JobKindArg::Fetch => JobKind::Fetch,
            JobKindArg::Export => JobKind::Export,
        }
    }
}
