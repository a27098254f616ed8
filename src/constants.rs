pub const DNS_HEADER_LEN: usize = 12;

// udp datagram buffer, reused every iteration
pub const MAX_MSG_LEN: usize = 2048;

// a label-length byte with the top 2 bits set is a compression pointer
// (rfc1035 4.1.4), the remaining 14 bits are an offset from the message start
pub const POINTER_MASK: u8 = 0b1100_0000;

// how many pointer hops we follow before declaring a cycle
pub const MAX_POINTER_HOPS: usize = 32;

// byte offset, bit offset, name, for easier enumeration/display only
// caution: in rfc1035 4.1.1 (and rfc6895 2), 0 actually denotes the highest bit
pub const FLAGS: &[(u8, u8, &str)] = &[
	(2, 7, "qr"), // query or response
	// 4 bits gap here is opcode
	(2, 2, "aa"), // authoritative answer
	(2, 1, "tc"), // truncated
	(2, 0, "rd"), // recursive desired
	(3, 7, "ra"), // recursive available
	(3, 6, "z"),  // zero
];
// 4 bits afterwards is rcode

// OpCode
pub const OPCODE_QUERY: u8 = 0;
const OPCODE_TABLE: &[&str] = &["Query"];

// RCode
pub const RCODE_NOERROR: u8 = 0;
pub const RCODE_SERVFAIL: u8 = 2;
pub const RCODE_NOTIMP: u8 = 4;
const RCODE_TABLE: &[&str] = &[
	"NoError", "FormErr", "ServFail", "NXDomain", "NotImp", "Refused",
];

// Class
pub const CLASS_IN: u16 = 1;
const CLASS_TABLE: &[&str] = &["IN"];

// Type
pub const TYPE_A: u16 = 1;
const TYPE_TABLE: &[&str] = &["A"];

pub fn opcode2str(c: u8) -> &'static str {
	code2str(OPCODE_TABLE, OPCODE_QUERY as u16, c as u16)
}

pub fn rcode2str(c: u8) -> &'static str {
	code2str(RCODE_TABLE, RCODE_NOERROR as u16, c as u16)
}

pub fn class2str(c: u16) -> &'static str {
	code2str(CLASS_TABLE, CLASS_IN, c)
}

pub fn type2str(c: u16) -> &'static str {
	code2str(TYPE_TABLE, TYPE_A, c)
}

fn code2str(table: &'static [&'static str], base: u16, c: u16) -> &'static str {
	match c.checked_sub(base).map(|c| c as usize) {
		Some(c) if c < table.len() => table[c],
		_ => "NotImplemented",
	}
}
