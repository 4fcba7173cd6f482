use log::*;

use crate::{
	address::{AddressProvider, AddressSource},
	dns::{
		peek_opcode, synthesize_response_with_ttl, Class, OpCode, Question, RRType, DNS_HEADER_LEN,
	},
	error::Result,
};

// one datagram in, at most one datagram out
pub struct Responder<S> {
	provider: AddressProvider<S>,
	response_ttl: u32,
}

impl<S: AddressSource> Responder<S> {
	pub fn new(provider: AddressProvider<S>, response_ttl: u32) -> Self {
		Responder {
			provider,
			response_ttl,
		}
	}

	#[cfg(test)]
	pub(crate) fn with_default_ttl(provider: AddressProvider<S>) -> Self {
		Self::new(provider, crate::dns::DEFAULT_RESPONSE_TTL)
	}

	pub fn provider_mut(&mut self) -> &mut AddressProvider<S> {
		&mut self.provider
	}

	// Ok(None) means drop the datagram silently
	// Err is only ever NoAddressAvailable, which the caller can't recover from
	pub fn respond(&mut self, query: &[u8]) -> Result<Option<Vec<u8>>> {
		if query.len() < DNS_HEADER_LEN {
			debug!("too short to contain a dns message: {}", query.len());
			return Ok(None);
		}
		let opcode = peek_opcode(query).map(OpCode::from);
		if opcode != Some(OpCode::Query) {
			if let Some(opcode) = opcode {
				warn!("ignoring unsupported opcode {}", opcode);
			}
			return Ok(None);
		}

		let addr = self.provider.current()?;
		let Some(resp) = synthesize_response_with_ttl(query, addr, self.response_ttl) else {
			return Ok(None);
		};
		match Question::decode(query) {
			Ok(q) => info!(
				"{} {} {} -> {}",
				q.domain(),
				Class::from(q.qclass),
				RRType::from(q.rrtype),
				addr
			),
			Err(e) => debug!("answered a question that doesn't decode: {}", e),
		}
		Ok(Some(resp))
	}
}
