use std::{
	net::{IpAddr, Ipv4Addr, ToSocketAddrs},
	time::Instant,
};

use log::*;

use crate::{
	error::{Error, Result},
	select::choose_address,
};

// where candidate addresses come from
pub trait AddressSource {
	fn interface_addresses(&self) -> Vec<String>;
	fn hostname_addresses(&self) -> Result<Vec<String>>;
}

// the OS: interface list, then whatever the local hostname resolves to
pub struct SystemSource;

impl AddressSource for SystemSource {
	fn interface_addresses(&self) -> Vec<String> {
		match if_addrs::get_if_addrs() {
			Ok(ifaces) => ifaces
				.iter()
				.filter_map(|i| match i.ip() {
					IpAddr::V4(v4) => Some(v4.to_string()),
					IpAddr::V6(_) => None,
				})
				.collect(),
			Err(e) => {
				warn!("unable to list network interfaces: {}", e);
				Vec::new()
			}
		}
	}

	fn hostname_addresses(&self) -> Result<Vec<String>> {
		let hostname = hostname::get()
			.map_err(|source| Error::Resolve {
				hostname: "local hostname".to_string(),
				source,
			})?
			.to_string_lossy()
			.into_owned();
		debug!("resolving hostname {hostname}");
		let addrs = (hostname.as_str(), 0)
			.to_socket_addrs()
			.map_err(|source| Error::Resolve {
				hostname: hostname.clone(),
				source,
			})?;
		Ok(addrs
			.filter_map(|a| match a.ip() {
				IpAddr::V4(v4) => Some(v4.to_string()),
				IpAddr::V6(_) => None,
			})
			.collect())
	}
}

// the one address every answer carries
// refreshed on first use and whenever it's older than `ttl` seconds, unless it's fixed
pub struct AddressProvider<S> {
	source: S,
	fixed: Option<Ipv4Addr>,
	ttl: u64,
	current: Option<Ipv4Addr>,
	refreshed: Instant,
}

impl<S: AddressSource> AddressProvider<S> {
	pub fn new(source: S, fixed: Option<Ipv4Addr>, ttl: u64) -> Self {
		AddressProvider {
			source,
			fixed,
			ttl,
			current: None,
			refreshed: Instant::now(),
		}
	}

	#[cfg(test)]
	pub(crate) fn source(&self) -> &S {
		&self.source
	}

	// whole seconds, a fixed address never ages
	pub fn age_at(&self, now: Instant) -> u64 {
		if self.fixed.is_some() {
			return 0;
		}
		now.saturating_duration_since(self.refreshed).as_secs()
	}

	pub fn current(&mut self) -> Result<Ipv4Addr> {
		self.current_at(Instant::now())
	}

	pub fn current_at(&mut self, now: Instant) -> Result<Ipv4Addr> {
		match self.current {
			Some(addr) if self.age_at(now) <= self.ttl => return Ok(addr),
			Some(addr) => debug!("address {addr} is stale, refreshing"),
			None => debug!("address not set, refreshing"),
		}
		self.refresh(now)
	}

	pub fn refresh(&mut self, now: Instant) -> Result<Ipv4Addr> {
		let addr = match self.fixed {
			Some(addr) => addr,
			None => self.discover()?,
		};
		if self.current != Some(addr) {
			info!("answering with {addr}");
		}
		self.current = Some(addr);
		self.refreshed = now;
		Ok(addr)
	}

	fn discover(&self) -> Result<Ipv4Addr> {
		debug!("attempting to determine response address from network interfaces");
		if let Some(addr) = choose_address(&self.source.interface_addresses()) {
			return Ok(addr);
		}
		debug!("attempting to determine response address from hostname");
		match self.source.hostname_addresses() {
			Ok(candidates) => {
				if let Some(addr) = choose_address(&candidates) {
					return Ok(addr);
				}
			}
			Err(e) => warn!("{}", e),
		}
		Err(Error::NoAddressAvailable)
	}
}
