use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sbridge")]
#[command(about = "Drive capture sessions through the session bridge and an HTTP processor")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON config file (endpoint, retries, reference prefix, ...)
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Webservice endpoint, overriding the config file
	#[arg(long, global = true, value_name = "URL")]
	pub endpoint: Option<String>,

	/// Device key identifier sent with every request
	#[arg(long, global = true, value_name = "KEY")]
	pub device_key: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run one session of the given kind (e.g. startLiveness)
	Run {
		/// Session kind tag
		tag: String,

		/// Request blob given inline as UTF-8 text
		#[arg(long, conflicts_with = "payload_file", required_unless_present = "payload_file")]
		payload: Option<String>,

		/// Request blob read from a file
		#[arg(long, value_name = "FILE")]
		payload_file: Option<PathBuf>,

		/// External reference retained from an earlier enrollment
		#[arg(long, value_name = "ID")]
		reference: Option<String>,
	},

	/// List the session kinds and how each treats the external reference
	Kinds,
}
