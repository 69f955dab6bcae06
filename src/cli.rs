use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "refactor-first",
    version,
    about = "Rank God classes by refactoring cost against change proneness"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pretty-print JSON output (default: compact)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank God class candidates of a repository by refactoring priority
    Rank {
        /// Repository root to analyze
        #[arg(short, long)]
        dir: String,

        /// Class metrics report to read instead of searching --dir
        #[arg(short, long)]
        metrics: Option<String>,

        /// Emit every metric, rank and timestamp per class
        #[arg(long)]
        details: bool,

        /// Only emit the N highest priorities
        #[arg(short, long)]
        limit: Option<usize>,

        /// WMC must exceed this to count as complex (default: 47)
        #[arg(long)]
        wmc_threshold: Option<u32>,

        /// ATFD must exceed this to count as coupled (default: 5)
        #[arg(long)]
        atfd_threshold: Option<u32>,

        /// TCC below this counts as poorly cohesive (default: 0.33)
        #[arg(long)]
        tcc_threshold: Option<f64>,
    },

    /// Check git availability and whether a directory can be ranked
    Doctor {
        /// Directory to check as a repository root
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Generate default configuration file
    Init {
        /// Path to write the configuration file (default: ~/.config/refactor-first/config.toml)
        #[arg(short, long)]
        path: Option<std::path::PathBuf>,
    },
}
