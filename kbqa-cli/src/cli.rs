//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::review::{DEFAULT_EXPORT_PATH, DEFAULT_REVIEW_LOG, ReviewStatus};

/// Ask questions of a markdown knowledge base
#[derive(Parser, Debug)]
#[command(name = "kbqa")]
#[command(version)]
#[command(about = "Ask questions of a markdown knowledge base", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Embedding backends selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Offline token-hashing embeddings
    #[default]
    Hash,
    /// OpenAI-compatible `/v1/embeddings` server
    Openai,
}

/// Knowledge-base settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// SQLite vector store
    #[arg(long, env = "KBQA_DB", default_value = "vector.db", global = true)]
    pub db: PathBuf,

    /// Folder of markdown documents to ingest
    #[arg(long, env = "KBQA_DOCS", default_value = "docs", global = true)]
    pub docs: PathBuf,

    /// Number of ranked sources retrieved per query
    #[arg(long, env = "KBQA_TOP_K", default_value_t = 5, global = true)]
    pub top_k: usize,

    /// Maximum chunk size in characters
    #[arg(long, env = "KBQA_CHUNK_SIZE", default_value_t = 1000, global = true)]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[arg(long, env = "KBQA_CHUNK_OVERLAP", default_value_t = 200, global = true)]
    pub chunk_overlap: usize,

    /// Sources must score above this to be used as context
    #[arg(long, env = "KBQA_RELEVANCE_FLOOR", default_value_t = 0.1, global = true)]
    pub relevance_floor: f32,

    /// Embedding backend
    #[arg(long, value_enum, env = "KBQA_EMBEDDING", default_value = "hash", global = true)]
    pub embedding: EmbeddingBackend,

    /// Embedding model name (openai backend)
    #[arg(long, env = "KBQA_EMBEDDING_MODEL", default_value = "text-embedding-3-small", global = true)]
    pub embedding_model: String,

    /// Base URL of an OpenAI-compatible embedding server
    #[arg(long, env = "KBQA_EMBEDDING_URL", global = true)]
    pub embedding_url: Option<String>,

    /// Embedding dimensionality
    #[arg(long, env = "KBQA_EMBEDDING_DIMENSIONS", global = true)]
    pub embedding_dimensions: Option<usize>,

    /// Generation model
    #[arg(long, env = "KBQA_MODEL", default_value = "gemma-3-27b-it", global = true)]
    pub model: String,

    /// JSON-lines log of questions flagged for review
    #[arg(long, env = "KBQA_REVIEW_LOG", default_value = DEFAULT_REVIEW_LOG, global = true)]
    pub review_log: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the docs folder into the vector store
    Ingest {
        /// Re-chunk and replace documents that are already stored
        #[arg(long)]
        overwrite: bool,
    },

    /// Rank the sources most similar to a query
    Search {
        query: String,

        /// Restrict results to these documents
        #[arg(long = "file", value_name = "NAME")]
        files: Vec<String>,
    },

    /// Answer a single question
    Ask {
        question: String,

        /// Restrict retrieval to these documents
        #[arg(long = "file", value_name = "NAME")]
        files: Vec<String>,

        /// Print the full answer record as JSON
        #[arg(long)]
        json: bool,

        /// Log the answer to the review log as not helpful
        #[arg(long)]
        report: bool,
    },

    /// Interactive question loop
    Chat {
        /// Restrict retrieval to these documents
        #[arg(long = "file", value_name = "NAME")]
        files: Vec<String>,
    },

    /// Print knowledge-base statistics as JSON
    Stats,

    /// Inspect and update the review log
    Review {
        #[command(subcommand)]
        action: ReviewCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReviewCommands {
    /// List logged questions
    List {
        /// Only show entries with this status
        #[arg(long)]
        status: Option<ReviewStatus>,
    },

    /// Print review counts as JSON
    Stats,

    /// Change the status of the entry logged at TIMESTAMP
    SetStatus { timestamp: String, status: ReviewStatus },

    /// Write the review log as a JSON array
    Export {
        #[arg(long, default_value = DEFAULT_EXPORT_PATH)]
        out: PathBuf,
    },
}
