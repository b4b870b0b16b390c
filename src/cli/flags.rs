use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "nightwatch",
    version,
    about = "Incident reports, SOS dispatch and community tips"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML). Default: config/nightwatch.toml
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// SQLite path for records (overrides config)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Acting principal id, as established by the identity layer
    #[arg(long = "as", global = true, default_value = "operator")]
    pub as_user: String,

    /// Display name of the acting principal
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Output format
    #[arg(long, value_enum, global = true, default_value = "json")]
    pub format: OutputFormatArg,

    /// Write output to a file instead of stdout
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Increase verbosity (info, debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log file path
    #[arg(long, global = true, default_value = "data/nightwatch.log")]
    pub log_file: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Citizen incident reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
    /// Emergency distress signals
    Sos {
        #[command(subcommand)]
        action: SosAction,
    },
    /// Community tips and votes
    Tip {
        #[command(subcommand)]
        action: TipAction,
    },
    /// Operator dashboard counts
    Summary,
    /// Plot-ready incident points
    Heatmap {
        /// Restrict to one category
        #[arg(long)]
        category: Option<String>,
        /// Look-back range (24h|7d|30d|90d|1y)
        #[arg(long, default_value = "7d")]
        range: String,
    },
    /// Poll a collection and print each refresh
    Watch {
        #[arg(value_enum)]
        target: WatchTarget,
        /// Override poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportAction {
    /// Submit a new report
    Create {
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: String,
        /// Hide the reporter's identity
        #[arg(long)]
        anonymous: bool,
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Uploaded media URIs
        #[arg(long, value_delimiter = ',')]
        media: Vec<String>,
        /// Uploaded case-diary URI (image or PDF)
        #[arg(long)]
        diary: Option<String>,
        /// Resolve and attach an address after creation
        #[arg(long)]
        geocode: bool,
    },
    /// List reports, newest first
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// Only reports within this range (24h|7d|30d|90d|1y)
        #[arg(long)]
        range: Option<String>,
        /// Only reports filed by the acting principal
        #[arg(long)]
        mine: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    Show {
        id: String,
    },
    /// Set status (Pending|Investigating|Resolved)
    Status {
        id: String,
        status: String,
    },
    /// Reverse-geocode a report's coordinate and attach the address
    Locate {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SosAction {
    /// Send a distress signal (after the client countdown has completed)
    Raise {
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        label: Option<String>,
    },
    List {
        #[arg(long)]
        status: Option<String>,
        /// Only signals raised by the acting principal
        #[arg(long)]
        mine: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    Show {
        id: String,
    },
    Dispatch {
        id: String,
    },
    Respond {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TipAction {
    Add {
        report_id: String,
        text: String,
        #[arg(long)]
        anonymous: bool,
    },
    List {
        report_id: String,
    },
    /// Vote +1 or -1 on a tip
    Vote {
        tip_id: String,
        #[arg(allow_negative_numbers = true)]
        direction: i64,
    },
    /// Withdraw the acting principal's vote
    Retract {
        tip_id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum WatchTarget {
    Sos,
    Reports,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormatArg {
    Json,
    Jsonl,
    Markdown,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Jsonl => OutputFormat::Jsonl,
            OutputFormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}
