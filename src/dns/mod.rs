use std::{fmt::Display, net::Ipv4Addr};

use log::*;
use thiserror::Error;

mod constants;

pub use constants::*;

// barebones dns codec for devns
// it does 2 things only:
// 	answer a raw query with 1 A record, without building any structure (synthesize_response)
// 	decode/encode header and question, for logging and tests

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
	#[error("too short to contain a dns message: {0} bytes")]
	TooShort(usize),
	#[error("question name is not terminated before the end of the packet")]
	Unterminated,
	#[error("question ends before QTYPE/QCLASS")]
	Truncated,
	#[error("empty label inside a name")]
	EmptyLabel,
	#[error("label of {0} bytes does not fit a length octet")]
	LabelTooLong(usize),
	#[error("label {0:?} is not single-byte text")]
	NotSingleByte(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
	pub id: u16,
	pub qr: bool,
	pub opcode: u8,
	pub aa: bool,
	pub tc: bool,
	pub rd: bool,
	pub ra: bool,
	pub z: bool,
	pub ad: bool,
	pub cd: bool,
	pub rcode: u8,
	pub query: u16,
	pub answer: u16,
	pub authority: u16,
	pub additional: u16,
}

impl Header {
	pub fn decode(msg: &[u8]) -> Result<Self, WireError> {
		if msg.len() < DNS_HEADER_LEN {
			return Err(WireError::TooShort(msg.len()));
		}
		Ok(Header {
			id: u16be(&msg[0..2]),
			qr: get_bit(msg[2], 7),
			opcode: get_bits(msg[2], 3, 4),
			aa: get_bit(msg[2], 2),
			tc: get_bit(msg[2], 1),
			rd: get_bit(msg[2], 0),
			ra: get_bit(msg[3], 7),
			z: get_bit(msg[3], 6),
			ad: get_bit(msg[3], 5),
			cd: get_bit(msg[3], 4),
			rcode: get_bits(msg[3], 0, 4),
			query: u16be(&msg[4..6]),
			answer: u16be(&msg[6..8]),
			authority: u16be(&msg[8..10]),
			additional: u16be(&msg[10..12]),
		})
	}

	// opcode and rcode are truncated to their 4 bits
	pub fn encode(&self) -> [u8; DNS_HEADER_LEN] {
		let mut b = [0u8; DNS_HEADER_LEN];
		b[0..2].copy_from_slice(&self.id.to_be_bytes());
		put_bit(&mut b[2], 7, self.qr);
		set_bits(&mut b[2], 3, 4, self.opcode);
		put_bit(&mut b[2], 2, self.aa);
		put_bit(&mut b[2], 1, self.tc);
		put_bit(&mut b[2], 0, self.rd);
		put_bit(&mut b[3], 7, self.ra);
		put_bit(&mut b[3], 6, self.z);
		put_bit(&mut b[3], 5, self.ad);
		put_bit(&mut b[3], 4, self.cd);
		set_bits(&mut b[3], 0, 4, self.rcode);
		b[4..6].copy_from_slice(&self.query.to_be_bytes());
		b[6..8].copy_from_slice(&self.answer.to_be_bytes());
		b[8..10].copy_from_slice(&self.authority.to_be_bytes());
		b[10..12].copy_from_slice(&self.additional.to_be_bytes());
		b
	}
}

// mimics dig/drill output
impl Display for Header {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		writeln!(
			f,
			";; ->>HEADER<<- opcode: {}, rcode: {}, id: {}",
			OpCode::from(self.opcode),
			RCode::from(self.rcode),
			self.id
		)?;
		write!(f, ";; flags:")?;
		let raw = self.encode();
		for &(o0, o1, name) in FLAGS {
			if get_bit(raw[o0 as usize], o1) {
				write!(f, " {name}")?;
			}
		}
		write!(
			f,
			"; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
			self.query, self.answer, self.authority, self.additional
		)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Question {
	pub rrtype: u16,
	// labels are opaque octets, each byte is kept as one char
	pub labels: Vec<String>,
	pub qclass: u16,
}

impl Question {
	// the first question of a message, it always starts right after the header
	pub fn decode(msg: &[u8]) -> Result<Self, WireError> {
		if msg.len() < DNS_HEADER_LEN {
			return Err(WireError::TooShort(msg.len()));
		}
		let mut labels: Vec<String> = Vec::with_capacity(4);
		let offset = name_end(msg, |label| {
			labels.push(label.iter().map(|&b| b as char).collect());
		})?;
		if offset + 4 > msg.len() {
			return Err(WireError::Truncated);
		}
		Ok(Question {
			rrtype: u16be(&msg[offset..offset + 2]),
			labels,
			qclass: u16be(&msg[offset + 2..offset + 4]),
		})
	}

	// the question section alone, without header
	pub fn encode(&self) -> Result<Vec<u8>, WireError> {
		let mut b = Vec::with_capacity(self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 5);
		for label in &self.labels {
			let bytes = label
				.chars()
				.map(|c| u8::try_from(c).map_err(|_| WireError::NotSingleByte(label.clone())))
				.collect::<Result<Vec<u8>, _>>()?;
			if bytes.is_empty() {
				return Err(WireError::EmptyLabel);
			}
			if bytes.len() > u8::MAX as usize {
				return Err(WireError::LabelTooLong(bytes.len()));
			}
			b.push(bytes.len() as u8);
			b.extend_from_slice(&bytes);
		}
		b.push(0);
		b.extend_from_slice(&self.rrtype.to_be_bytes());
		b.extend_from_slice(&self.qclass.to_be_bytes());
		Ok(b)
	}

	pub fn domain(&self) -> String {
		self.labels.join(".")
	}
}

impl Display for Question {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			";{}.\t\t{}\t{}",
			self.domain(),
			Class::from(self.qclass),
			RRType::from(self.rrtype)
		)
	}
}

// opcode straight from the flags byte, None if the packet doesn't even reach it
pub fn peek_opcode(msg: &[u8]) -> Option<u8> {
	msg.get(2).map(|&b| get_bits(b, 3, 4))
}

pub fn synthesize_response(query: &[u8], addr: Ipv4Addr) -> Option<Vec<u8>> {
	synthesize_response_with_ttl(query, addr, DEFAULT_RESPONSE_TTL)
}

// answer `query` with a single A record pointing at `addr`
// returns None if the query should be dropped: too short, unterminated or not a standard query
pub fn synthesize_response_with_ttl(query: &[u8], addr: Ipv4Addr, ttl: u32) -> Option<Vec<u8>> {
	if query.len() < DNS_HEADER_LEN {
		debug!("too short to contain a dns message: {}", query.len());
		return None;
	}
	if peek_opcode(query) != Some(u8::from(OpCode::Query)) {
		return None;
	}
	let end = name_end(query, |_| {})
		.inspect_err(|e| debug!("dropping query: {}", e))
		.ok()?
		+ 4;
	if end > query.len() {
		debug!("dropping query: {}", WireError::Truncated);
		return None;
	}

	let mut resp = Vec::with_capacity(end + 16);
	resp.extend_from_slice(&query[0..2]);
	resp.extend_from_slice(&RESPONSE_FLAGS);
	// QDCOUNT mirrored, ANCOUNT 1, NSCOUNT ARCOUNT 0
	resp.extend_from_slice(&query[4..6]);
	resp.extend_from_slice(&1u16.to_be_bytes());
	resp.extend_from_slice(&[0; 4]);
	resp.extend_from_slice(&query[DNS_HEADER_LEN..end]);

	resp.extend_from_slice(&QNAME_POINTER.to_be_bytes());
	resp.extend_from_slice(&u16::from(RRType::A).to_be_bytes());
	resp.extend_from_slice(&u16::from(Class::IN).to_be_bytes());
	resp.extend_from_slice(&ttl.to_be_bytes());
	resp.extend_from_slice(&4u16.to_be_bytes());
	resp.extend_from_slice(&addr.octets());
	Some(resp)
}

// walks the labels of the name at the start of the question section
// returns the offset just past the zero-length terminator
fn name_end(msg: &[u8], mut visit: impl FnMut(&[u8])) -> Result<usize, WireError> {
	let mut offset = DNS_HEADER_LEN;
	loop {
		let Some(&label_len) = msg.get(offset) else {
			return Err(WireError::Unterminated);
		};
		let label_len = label_len as usize;
		if label_len == 0 {
			return Ok(offset + 1);
		}
		if offset + 1 + label_len > msg.len() {
			return Err(WireError::Unterminated);
		}
		visit(&msg[offset + 1..offset + 1 + label_len]);
		offset += 1 + label_len;
	}
}

fn u16be(bytes: &[u8]) -> u16 {
	u16::from_be_bytes([bytes[0], bytes[1]])
}

// I really liked bitfields in C
fn get_bit(b: u8, o: u8) -> bool {
	(b >> o) & 1 == 1
}
fn get_bits(b: u8, o: u8, l: u8) -> u8 {
	(b >> o) & ((1 << l) - 1)
}
fn put_bit(b: &mut u8, o: u8, v: bool) {
	if v {
		*b |= 1 << o;
	} else {
		*b &= !(1 << o);
	}
}
fn set_bits(b: &mut u8, o: u8, l: u8, v: u8) {
	let mask = (1 << l) - 1;
	*b = (*b & !(mask << o)) | ((v & mask) << o);
}

#[cfg(test)]
mod tests {
	use hickory_proto::{op::Message, rr::RecordType};
	use rand::{rng, Rng};

	use super::*;

	const QUERY: &[u8] = b"\x96\xd1\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\x05local\x03dev\x00\x00\x01\x00\x01";
	const RESPONSE: &[u8] = b"\x96\xd1\x81\x80\x00\x01\x00\x01\x00\x00\x00\x00\x05local\x03dev\x00\x00\x01\x00\x01\xc0\x0c\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x04\x01\x02\x03\x04";

	fn with_opcode(msg: &[u8], opcode: u8) -> Vec<u8> {
		let mut msg = msg.to_vec();
		set_bits(&mut msg[2], 3, 4, opcode);
		msg
	}

	#[test]
	fn decode_header() {
		let h = Header::decode(QUERY).unwrap();
		assert_eq!(h.id, 0x96d1);
		assert!(!h.qr);
		assert_eq!(h.opcode, 0);
		assert!(h.rd);
		assert!(!h.ra);
		assert_eq!(h.rcode, 0);
		assert_eq!((h.query, h.answer, h.authority, h.additional), (1, 0, 0, 0));

		let h = Header::decode(RESPONSE).unwrap();
		assert!(h.qr && h.rd && h.ra);
		assert_eq!(h.answer, 1);
		assert_eq!(
			h.to_string(),
			";; ->>HEADER<<- opcode: Query, rcode: NoError, id: 38609\n\
			;; flags: qr rd ra; QUERY: 1, ANSWER: 1, AUTHORITY: 0, ADDITIONAL: 0"
		);
	}

	#[test]
	fn decode_header_too_short() {
		assert_eq!(Header::decode(&QUERY[..11]), Err(WireError::TooShort(11)));
		assert_eq!(Header::decode(&[]), Err(WireError::TooShort(0)));
	}

	#[test]
	fn header_round_trip() {
		let mut rand = rng();
		for _ in 0..0x1000 {
			let h = Header {
				id: rand.random(),
				qr: rand.random(),
				opcode: rand.random_range(0..16),
				aa: rand.random(),
				tc: rand.random(),
				rd: rand.random(),
				ra: rand.random(),
				z: rand.random(),
				ad: rand.random(),
				cd: rand.random(),
				rcode: rand.random_range(0..16),
				query: rand.random(),
				answer: rand.random(),
				authority: rand.random(),
				additional: rand.random(),
			};
			assert_eq!(Header::decode(&h.encode()).unwrap(), h);
		}
	}

	#[test]
	fn header_fields_stay_in_width() {
		let h = Header {
			opcode: 0xff,
			rcode: 0xff,
			..Default::default()
		};
		let raw = h.encode();
		assert_eq!(raw[2], 0b0111_1000);
		assert_eq!(raw[3], 0b0000_1111);
	}

	#[test]
	fn decode_question() {
		let q = Question::decode(QUERY).unwrap();
		assert_eq!(q.labels, vec!["local", "dev"]);
		assert_eq!(q.domain(), "local.dev");
		assert_eq!(q.rrtype, 1);
		assert_eq!(q.qclass, 1);
		assert_eq!(q.to_string(), ";local.dev.\t\tIN\tA");
		assert_eq!(q.encode().unwrap(), &QUERY[DNS_HEADER_LEN..]);
	}

	#[test]
	fn decode_question_malformed() {
		// name runs off the end
		assert_eq!(Question::decode(&QUERY[..20]), Err(WireError::Unterminated));
		// label length points past the end
		let mut msg = QUERY[..DNS_HEADER_LEN].to_vec();
		msg.extend_from_slice(b"\x3fshort");
		assert_eq!(Question::decode(&msg), Err(WireError::Unterminated));
		// no terminator at all, just labels up to the last byte
		let mut msg = QUERY[..DNS_HEADER_LEN].to_vec();
		for _ in 0..100 {
			msg.extend_from_slice(b"\x01a");
		}
		assert_eq!(Question::decode(&msg), Err(WireError::Unterminated));
		// terminated but QCLASS missing
		let len = QUERY.len();
		assert_eq!(Question::decode(&QUERY[..len - 2]), Err(WireError::Truncated));
		assert_eq!(Question::decode(&QUERY[..5]), Err(WireError::TooShort(5)));
	}

	#[test]
	fn question_round_trip() {
		let mut rand = rng();
		for _ in 0..0x400 {
			let labels = (0..rand.random_range(0..6))
				.map(|_| {
					(0..rand.random_range(1..=255))
						.map(|_| rand.random_range(1..=255u8) as char)
						.collect::<String>()
				})
				.collect();
			let q = Question {
				rrtype: rand.random(),
				labels,
				qclass: rand.random(),
			};
			let mut msg = Header::default().encode().to_vec();
			msg.extend_from_slice(&q.encode().unwrap());
			assert_eq!(Question::decode(&msg).unwrap(), q);
		}
	}

	#[test]
	fn encode_question_rejects() {
		let q = |label: String| Question {
			rrtype: 1,
			labels: vec![label],
			qclass: 1,
		};
		assert_eq!(q("a".repeat(256)).encode(), Err(WireError::LabelTooLong(256)));
		assert_eq!(q(String::new()).encode(), Err(WireError::EmptyLabel));
		assert_eq!(
			q("\u{20ac}".to_string()).encode(),
			Err(WireError::NotSingleByte("\u{20ac}".to_string()))
		);
		// latin-1 range is fine
		assert!(q("caf\u{e9}".to_string()).encode().is_ok());
	}

	#[test]
	fn synthesize() {
		let resp = synthesize_response(QUERY, Ipv4Addr::new(1, 2, 3, 4)).unwrap();
		assert_eq!(resp, RESPONSE);
	}

	#[test]
	fn synthesize_with_ttl() {
		let resp = synthesize_response_with_ttl(QUERY, Ipv4Addr::new(10, 0, 0, 7), 300).unwrap();
		let len = resp.len();
		assert_eq!(&resp[len - 10..len - 6], &300u32.to_be_bytes());
		assert_eq!(&resp[len - 4..], &[10, 0, 0, 7]);
	}

	#[test]
	fn synthesize_drops_other_opcodes() {
		let addr = Ipv4Addr::new(1, 2, 3, 4);
		assert!(synthesize_response(&with_opcode(QUERY, 0x0a), addr).is_none());
		for opcode in 1..16 {
			assert!(synthesize_response(&with_opcode(QUERY, opcode), addr).is_none());
		}
	}

	#[test]
	fn synthesize_drops_malformed() {
		let addr = Ipv4Addr::new(1, 2, 3, 4);
		assert!(synthesize_response(&QUERY[..11], addr).is_none());
		assert!(synthesize_response(&QUERY[..DNS_HEADER_LEN], addr).is_none());
		assert!(synthesize_response(&QUERY[..20], addr).is_none());
		assert!(synthesize_response(&QUERY[..QUERY.len() - 1], addr).is_none());
	}

	#[test]
	fn synthesize_counts_and_sections() {
		let mut rand = rng();
		let addr = Ipv4Addr::new(192, 168, 1, 5);
		for _ in 0..0x100 {
			let h = Header {
				id: rand.random(),
				rd: rand.random(),
				query: rand.random_range(1..3),
				answer: rand.random(),
				authority: rand.random(),
				additional: rand.random(),
				..Default::default()
			};
			let q = Question {
				rrtype: rand.random(),
				labels: vec!["www".into(), "myapp".into(), "dev".into()],
				qclass: 1,
			};
			let mut msg = h.encode().to_vec();
			let question = q.encode().unwrap();
			msg.extend_from_slice(&question);
			// anything after the question (an OPT record for instance) is not echoed
			msg.extend_from_slice(b"\x00\x00\x29\x10\x00\x00\x00\x00\x00\x00\x00");

			let resp = synthesize_response(&msg, addr).unwrap();
			let rh = Header::decode(&resp).unwrap();
			assert_eq!(rh.id, h.id);
			assert!(rh.qr);
			assert_eq!(rh.opcode, 0);
			assert_eq!(rh.rcode, 0);
			assert_eq!(rh.query, h.query);
			assert_eq!((rh.answer, rh.authority, rh.additional), (1, 0, 0));
			assert_eq!(&resp[DNS_HEADER_LEN..DNS_HEADER_LEN + question.len()], &question[..]);
			assert_eq!(resp.len(), DNS_HEADER_LEN + question.len() + 16);
		}
	}

	#[test]
	fn synthesized_response_parses() {
		let resp = synthesize_response(QUERY, Ipv4Addr::new(127, 0, 0, 1)).unwrap();
		let m = Message::from_vec(&resp).unwrap();
		assert_eq!(m.id(), 0x96d1);
		assert_eq!(m.query_count(), 1);
		assert_eq!(m.answer_count(), 1);
		assert_eq!(m.queries()[0].name().to_ascii(), "local.dev.");
		let a = &m.answers()[0];
		assert_eq!(a.record_type(), RecordType::A);
		assert_eq!(a.ttl(), DEFAULT_RESPONSE_TTL);
		assert_eq!(a.name().to_ascii(), "local.dev.");
	}

	#[test]
	fn peek() {
		assert_eq!(peek_opcode(QUERY), Some(0));
		assert_eq!(peek_opcode(&with_opcode(QUERY, 5)), Some(5));
		assert_eq!(peek_opcode(&QUERY[..2]), None);
	}
}
