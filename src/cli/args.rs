//! Command-line argument parsing for askbuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// askbuddy - Answer questions from your documents, Wikipedia or the web
#[derive(Parser, Debug)]
#[command(name = "askbuddy")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Route a question to the right knowledge source and answer it with a local Ollama model", long_about = None)]
pub struct Args {
    /// Question to answer
    #[arg(value_name = "QUESTION")]
    pub question: Option<String>,

    /// Ollama model to use (overrides the config file)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama host (overrides the config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Ollama port (overrides the config file)
    #[arg(long)]
    pub port: Option<u16>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the answer as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except final result)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk and index the text files of a directory into the document corpus
    Ingest {
        /// Directory containing .txt / .md documents
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Check the generation service, vector store and web search key
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check if question is required and provided
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_none() && self.question.is_none() {
            return Err("Question required. Use 'askbuddy <QUESTION>' or run a subcommand.".to_string());
        }

        if self.command.is_some() && self.question.is_some() {
            return Err("Cannot specify a question with a subcommand.".to_string());
        }

        Ok(())
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default tracing filter directive for this verbosity
    pub fn log_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "askbuddy=info,warn",
            Verbosity::Verbose => "askbuddy=debug,info",
            Verbosity::VeryVerbose => "askbuddy=trace,debug",
        }
    }

    /// Check if should show the progress spinner
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should print the source attempt trace
    pub fn show_attempts(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
