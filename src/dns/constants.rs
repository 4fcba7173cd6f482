use std::fmt::Display;

pub const DNS_HEADER_LEN: usize = 12;

// seconds, written into every answer unless configured otherwise
pub const DEFAULT_RESPONSE_TTL: u32 = 60;

// rfc1035 4.1.4 message compression, the question name always sits right after the header
pub const QNAME_POINTER: u16 = 0b1100_0000_0000_0000 | DNS_HEADER_LEN as u16;

// QR RD / RA set, RCODE=NoError, opcode always written back as Query
pub const RESPONSE_FLAGS: [u8; 2] = [0x81, 0x80];

// byte offset, bit offset, name, for easier enumeration/display only
// caution: in rfc1035 4.1.1 (and rfc6895 2), 0 actually denotes the highest bit
// ad and cd are introduced in rfc2535 6.7
pub const FLAGS: &[(u8, u8, &str)] = &[
	(2, 7, "qr"), // query or response
	// 4 bits gap here is opcode
	(2, 2, "aa"), // authoritative answer
	(2, 1, "tc"), // truncated
	(2, 0, "rd"), // recursive desired
	(3, 7, "ra"), // recursive available
	(3, 6, "z"),  // zero
	(3, 5, "ad"), // authentic data
	(3, 4, "cd"), // checking disabled
];
// 4 bits afterwards is rcode

// value <-> name tables, anything not listed is kept as-is in the catch-all variant
macro_rules! code_enum {
	($name:ident($repr:ty) { $($variant:ident = $value:literal, $text:literal;)* }) => {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		pub enum $name {
			$($variant,)*
			Unassigned($repr),
		}

		impl From<$repr> for $name {
			fn from(v: $repr) -> Self {
				match v {
					$($value => Self::$variant,)*
					v => Self::Unassigned(v),
				}
			}
		}

		impl From<$name> for $repr {
			fn from(v: $name) -> Self {
				match v {
					$($name::$variant => $value,)*
					$name::Unassigned(v) => v,
				}
			}
		}

		impl $name {
			pub fn name(&self) -> &'static str {
				match self {
					$(Self::$variant => $text,)*
					Self::Unassigned(_) => "NotImplemented",
				}
			}
		}

		impl Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				match self {
					Self::Unassigned(v) => write!(f, "{}{}", stringify!($name), v),
					_ => write!(f, "{}", self.name()),
				}
			}
		}
	};
}

code_enum!(OpCode(u8) {
	Query = 0, "Query";
	IQuery = 1, "IQuery"; // obsolete
	Status = 2, "Status";
	Notify = 4, "Notify";
	Update = 5, "Update";
});

code_enum!(RCode(u8) {
	NoError = 0, "NoError";
	FormErr = 1, "FormErr";
	ServFail = 2, "ServFail";
	NXDomain = 3, "NXDomain";
	NotImp = 4, "NotImp";
	Refused = 5, "Refused";
	YXDomain = 6, "YXDomain";
	YXRRSet = 7, "YXRRSet";
	NXRRSet = 8, "NXRRSet";
	NotAuth = 9, "NotAuth";
	NotZone = 10, "NotZone";
});

code_enum!(Class(u16) {
	IN = 1, "IN";
	CH = 3, "CH";
	HS = 4, "HS";
	ANY = 255, "ANY";
});

code_enum!(RRType(u16) {
	A = 1, "A";
	NS = 2, "NS";
	CNAME = 5, "CNAME";
	SOA = 6, "SOA";
	PTR = 12, "PTR";
	MX = 15, "MX";
	TXT = 16, "TXT";
	AAAA = 28, "AAAA";
	SRV = 33, "SRV";
	OPT = 41, "OPT";
	HTTPS = 65, "HTTPS";
	ANY = 255, "ANY";
});
