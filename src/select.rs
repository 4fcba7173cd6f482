use std::net::Ipv4Addr;

use log::*;

// picks the address that looks the most like this machine on the LAN:
// loopback or rfc1918 only, real interfaces win over loopback,
// then the highest last octet wins
pub fn choose_address<S: AsRef<str>>(candidates: &[S]) -> Option<Ipv4Addr> {
	debug!(
		"selecting the best address from {:?}",
		candidates.iter().map(|c| c.as_ref()).collect::<Vec<_>>()
	);
	let chosen = candidates
		.iter()
		.filter_map(|c| {
			let c = c.as_ref();
			let addr = parse_octets(c).filter(acceptable);
			match addr {
				Some(_) => debug!("considering {c}"),
				None => debug!("skipping {c}"),
			}
			addr
		})
		// max_by_key keeps the last of equal keys
		.max_by_key(rank);
	match chosen {
		Some(addr) => debug!("selected address {addr}"),
		None => warn!(
			"found no suitable address in {:?}",
			candidates.iter().map(|c| c.as_ref()).collect::<Vec<_>>()
		),
	}
	chosen
}

// leading zeros are fine here, "010.0.0.5" is 10.0.0.5
fn parse_octets(s: &str) -> Option<Ipv4Addr> {
	let mut octets = [0u8; 4];
	let mut parts = s.split('.');
	for o in octets.iter_mut() {
		*o = parts.next()?.trim().parse().ok()?;
	}
	if parts.next().is_some() {
		return None;
	}
	Some(Ipv4Addr::from(octets))
}

fn acceptable(addr: &Ipv4Addr) -> bool {
	let [a, b, _, d] = addr.octets();
	if d == 255 {
		return false;
	}
	match a {
		10 | 127 => true,
		172 => b > 15 && b < 32,
		192 => b == 168,
		_ => false,
	}
}

fn rank(addr: &Ipv4Addr) -> (u8, u8) {
	let [a, _, _, d] = addr.octets();
	(if a == 127 { 0 } else { 1 }, d)
}
