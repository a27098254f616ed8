use std::{fmt::Display, net::Ipv4Addr};

use crate::constants::*;

// in-memory dns message: header + questions + answers
// names are kept in canonical dotted form, never as raw wire bytes,
// so encoding always regenerates labels and no compression pointer
// from an incoming buffer can leak into outgoing messages

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
	pub id: u16,
	pub flags: u16,
	pub qdcount: u16,
	pub ancount: u16,
	pub nscount: u16,
	pub arcount: u16,
}

impl Header {
	// header of a fresh recursive query: rd set, everything else zero
	pub fn query(id: u16) -> Header {
		Header {
			id,
			flags: 0b0000_0001_0000_0000,
			qdcount: 1,
			..Default::default()
		}
	}

	// response header: qr set, opcode preserved, aa/tc/rd/ra/z cleared
	pub fn response(id: u16, opcode: u8, rcode: u8, qdcount: u16, ancount: u16) -> Header {
		Header {
			id,
			flags: 0x8000 | ((opcode as u16 & 0xF) << 11) | (rcode as u16 & 0xF),
			qdcount,
			ancount,
			..Default::default()
		}
	}

	pub fn qr(&self) -> bool {
		self.get_flag(2, 7)
	}
	pub fn rd(&self) -> bool {
		self.get_flag(2, 0)
	}

	pub fn opcode(&self) -> u8 {
		((self.flags >> 11) & 0xF) as u8
	}
	pub fn rcode(&self) -> u8 {
		(self.flags & 0xF) as u8
	}

	fn get_flag(&self, o_byte: u8, o_bit: u8) -> bool {
		let b = (self.flags >> (8 * (3 - o_byte as u16))) as u8;
		(b >> o_bit) & 1 == 1
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
	pub qname: String,
	pub qtype: u16,
	pub qclass: u16,
}

impl Question {
	pub fn a(qname: &str) -> Question {
		Question {
			qname: qname.to_string(),
			qtype: TYPE_A,
			qclass: CLASS_IN,
		}
	}
}

// resource record; rdlength is implied 4 since only A/IN is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
	pub name: String,
	pub rtype: u16,
	pub class: u16,
	pub ttl: u32,
	pub rdata: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
	pub header: Header,
	pub questions: Vec<Question>,
	pub answers: Vec<Answer>,
}

// mimics dig/drill output
impl Display for Message {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let h = &self.header;
		writeln!(
			f,
			";; ->>HEADER<<- opcode: {}, rcode: {}, id: {}",
			opcode2str(h.opcode()),
			rcode2str(h.rcode()),
			h.id
		)?;
		write!(f, ";; flags:")?;
		for &(o0, o1, name) in FLAGS {
			if h.get_flag(o0, o1) {
				write!(f, " {name}")?;
			}
		}
		writeln!(
			f,
			"; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
			h.qdcount, h.ancount, h.nscount, h.arcount
		)?;
		for q in &self.questions {
			writeln!(
				f,
				";{}.\t{}\t{}",
				q.qname,
				class2str(q.qclass),
				type2str(q.qtype)
			)?;
		}
		for a in &self.answers {
			writeln!(
				f,
				"{}.\t{}\t{}\t{}\t{}",
				a.name,
				a.ttl,
				class2str(a.class),
				type2str(a.rtype),
				a.rdata
			)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_header_flags() {
		let h = Header::query(0x1234);
		assert_eq!(h.id, 0x1234);
		assert_eq!(h.flags, 0x0100);
		assert!(h.rd());
		assert!(!h.qr());
		assert_eq!(h.opcode(), 0);
		assert_eq!(h.qdcount, 1);
	}

	#[test]
	fn response_header_preserves_opcode() {
		let h = Header::response(7, 2, RCODE_NOTIMP, 1, 0);
		assert!(h.qr());
		assert!(!h.rd());
		assert_eq!(h.opcode(), 2);
		assert_eq!(h.rcode(), RCODE_NOTIMP);
	}
}
