use std::{net::Ipv4Addr, path::PathBuf};

use clap::{ArgAction, Parser};

use crate::dns::DEFAULT_RESPONSE_TTL;

/// DNS server for developers: answers every A query with this machine's address
#[derive(Parser, Debug)]
#[clap(name = "devns", version)]
pub struct Args {
	/// address to listen on
	#[clap(long, default_value = "0.0.0.0")]
	pub host: String,
	/// port to listen on, 0 picks a random one
	#[clap(long, default_value_t = 0)]
	pub port: u16,
	/// IP address to respond with, discovered from the network interfaces if omitted
	#[clap(long)]
	pub address: Option<Ipv4Addr>,
	/// seconds before a discovered address is looked up again
	#[clap(long, default_value_t = 300)]
	pub ttl: u64,
	/// TTL of the answers, in seconds
	#[clap(long, default_value_t = DEFAULT_RESPONSE_TTL)]
	pub response_ttl: u32,

	/// don't put files in the resolver dir
	#[clap(short = 'n', long = "no-resolver", action = ArgAction::SetFalse)]
	pub resolver: bool,
	#[clap(long, default_value = "/etc/resolver")]
	pub resolver_dir: PathBuf,
	/// domains to create resolver files for
	#[clap(default_values_t = [String::from("dev")])]
	pub domains: Vec<String>,

	/// verbose output, repeat for more
	#[clap(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
	pub verbose: u8,
	/// quiet mode
	#[clap(short, long)]
	pub quiet: bool,
}

impl Args {
	// env_logger filter, RUST_LOG still wins
	pub fn log_level(&self) -> &'static str {
		if self.quiet {
			return "off";
		}
		match self.verbose {
			0 => "error",
			1 => "warn",
			2 => "info",
			3 => "debug",
			_ => "trace",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub address: Option<Ipv4Addr>,
	pub bind_host: String,
	pub bind_port: u16,
	pub ttl: u64,
	pub response_ttl: u32,
	pub resolver: bool,
	pub resolver_dir: PathBuf,
	pub domains: Vec<String>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			address: None,
			bind_host: "0.0.0.0".to_string(),
			bind_port: 0,
			ttl: 300,
			response_ttl: DEFAULT_RESPONSE_TTL,
			resolver: true,
			resolver_dir: PathBuf::from("/etc/resolver"),
			domains: vec!["dev".to_string()],
		}
	}
}

impl From<Args> for Config {
	fn from(args: Args) -> Self {
		Config {
			address: args.address,
			bind_host: args.host,
			bind_port: args.port,
			ttl: args.ttl,
			response_ttl: args.response_ttl,
			resolver: args.resolver,
			resolver_dir: args.resolver_dir,
			domains: args.domains,
		}
	}
}
