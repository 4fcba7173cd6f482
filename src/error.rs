use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("could not determine a suitable response address, please specify one with --address")]
	NoAddressAvailable,
	#[error("failed to bind {addr}: {source}")]
	Bind { addr: String, source: io::Error },
	#[error("failed to write resolver config {}: {source}", .path.display())]
	ResolverConfig { path: PathBuf, source: io::Error },
	#[error("unable to resolve {hostname}: {source}")]
	Resolve { hostname: String, source: io::Error },
}

impl Error {
	// process exit status
	pub fn exit_code(&self) -> u8 {
		match self {
			Error::Bind { .. } => 2,
			Error::ResolverConfig { .. } => 3,
			_ => 1,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
