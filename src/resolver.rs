// resolver(5) entries, one file per domain under e.g. /etc/resolver
// entries only live as long as the guard holding them

use std::{
	fs,
	io::{self, ErrorKind},
	net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
	path::{Path, PathBuf},
};

use log::*;

use crate::error::{Error, Result};

#[derive(Default)]
pub struct ResolverEntries {
	dir: PathBuf,
	paths: Vec<PathBuf>,
}

impl ResolverEntries {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		ResolverEntries {
			dir: dir.into(),
			paths: Vec::new(),
		}
	}

	// all or nothing, entries written before a failure are removed again when the guard drops
	pub fn write_all(
		dir: impl Into<PathBuf>,
		domains: &[String],
		server: SocketAddr,
	) -> Result<Self> {
		let mut entries = Self::new(dir);
		if !entries.dir.is_dir() {
			info!(
				"resolver dir {} does not exist, creating it",
				entries.dir.display()
			);
			fs::create_dir_all(&entries.dir).map_err(|source| Error::ResolverConfig {
				path: entries.dir.clone(),
				source,
			})?;
		}
		for domain in domains {
			entries.write_entry(domain, server)?;
		}
		Ok(entries)
	}

	pub fn paths(&self) -> &[PathBuf] {
		&self.paths
	}

	pub fn write_entry(&mut self, domain: &str, server: SocketAddr) -> Result<()> {
		let path = entry_path(&self.dir, domain)?;
		debug!("writing resolver config to {}", path.display());
		fs::write(&path, entry_contents(server)).map_err(|source| Error::ResolverConfig {
			path: path.clone(),
			source,
		})?;
		self.paths.push(path);
		Ok(())
	}

	// false if this guard never wrote an entry for `domain`
	pub fn remove_entry(&mut self, domain: &str) -> bool {
		let path = self.dir.join(domain);
		let Some(i) = self.paths.iter().position(|p| *p == path) else {
			return false;
		};
		remove(&self.paths.remove(i));
		true
	}
}

impl Drop for ResolverEntries {
	fn drop(&mut self) {
		while let Some(path) = self.paths.pop() {
			remove(&path);
		}
	}
}

fn remove(path: &Path) {
	debug!("cleaning up resolver config {}", path.display());
	match fs::remove_file(path) {
		Ok(()) => {}
		Err(e) if e.kind() == ErrorKind::NotFound => {
			debug!("resolver config {} already gone", path.display());
		}
		Err(e) => error!(
			"failed cleaning up resolver config {}: {}",
			path.display(),
			e
		),
	}
}

fn entry_path(dir: &Path, domain: &str) -> Result<PathBuf> {
	if domain.is_empty() || domain == "." || domain == ".." || domain.contains(['/', '\\']) {
		return Err(Error::ResolverConfig {
			path: dir.join(domain),
			source: io::Error::new(ErrorKind::InvalidInput, "not a valid domain"),
		});
	}
	Ok(dir.join(domain))
}

// the resolver can't reach an unspecified address, point it at loopback instead
fn entry_contents(server: SocketAddr) -> String {
	let host = match server.ip() {
		IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
		IpAddr::V6(v6) if v6.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
		ip => ip,
	};
	format!(
		"# generated by devns\nnameserver {}\nport {}",
		host,
		server.port()
	)
}
