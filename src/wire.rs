use std::net::Ipv4Addr;

use thiserror::Error;

use crate::constants::*;
use crate::msg::{Answer, Header, Message, Question};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
	#[error("truncated message: need {need} bytes at offset {at}")]
	Truncated { at: usize, need: usize },

	#[error("compression pointer limit exceeded ({MAX_POINTER_HOPS} hops)")]
	PointerLoop,

	#[error("unsupported rdata length {0}, only 4-byte A records are handled")]
	UnsupportedRdata(u16),
}

// read cursor bound to the buffer length; every access is checked, so a
// lying count or a wild compression offset surfaces as Truncated instead
// of reading past the datagram
pub struct Cursor<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	pub fn new(buf: &'a [u8]) -> Cursor<'a> {
		Cursor { buf, pos: 0 }
	}

	pub fn pos(&self) -> usize {
		self.pos
	}

	pub fn set_pos(&mut self, pos: usize) {
		self.pos = pos;
	}

	pub fn remaining(&self) -> usize {
		self.buf.len() - self.pos
	}

	// checked random access, used by the name decoder to follow pointers
	fn get(&self, at: usize) -> Result<u8, ParseError> {
		self.buf
			.get(at)
			.copied()
			.ok_or(ParseError::Truncated { at, need: 1 })
	}

	fn get_slice(&self, at: usize, len: usize) -> Result<&'a [u8], ParseError> {
		self.buf
			.get(at..at + len)
			.ok_or(ParseError::Truncated { at, need: len })
	}

	fn peek(&self) -> Option<u8> {
		self.buf.get(self.pos).copied()
	}

	fn advance(&mut self, n: usize) {
		self.pos += n;
	}

	pub fn read_u16(&mut self) -> Result<u16, ParseError> {
		let b = self.get_slice(self.pos, 2)?;
		self.pos += 2;
		Ok(u16::from_be_bytes([b[0], b[1]]))
	}

	pub fn read_u32(&mut self) -> Result<u32, ParseError> {
		let b = self.get_slice(self.pos, 4)?;
		self.pos += 4;
		Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
	}
}

// name -> length-prefixed labels, zero terminated
// empty segments (leading/trailing dots) are dropped rather than rejected
pub fn encode_name(name: &str, out: &mut Vec<u8>) {
	for label in name.split('.').filter(|l| !l.is_empty()) {
		out.push(label.len() as u8);
		out.extend_from_slice(label.as_bytes());
	}
	out.push(0);
}

// labels -> canonical dotted name, following compression pointers
// only the read position jumps on a pointer; the section cursor resumes
// right after the first pointer's 2 bytes
pub fn decode_name(cur: &mut Cursor) -> Result<String, ParseError> {
	let mut name = String::new();
	let mut pos = cur.pos();
	let mut resume = None;
	let mut hops = 0;
	loop {
		let len = cur.get(pos)?;
		if len & POINTER_MASK == POINTER_MASK {
			let lo = cur.get(pos + 1)?;
			if resume.is_none() {
				resume = Some(pos + 2);
			}
			hops += 1;
			if hops > MAX_POINTER_HOPS {
				return Err(ParseError::PointerLoop);
			}
			pos = ((len as usize & 0x3F) << 8) | lo as usize;
		} else if len == 0 {
			pos += 1;
			break;
		} else {
			let label = cur.get_slice(pos + 1, len as usize)?;
			if !name.is_empty() {
				name.push('.');
			}
			name.push_str(&String::from_utf8_lossy(label));
			pos += 1 + len as usize;
		}
	}
	cur.set_pos(resume.unwrap_or(pos));
	Ok(name)
}

pub fn encode(msg: &Message, include_question: bool, include_answer: bool) -> Vec<u8> {
	let mut out = Vec::with_capacity(MAX_MSG_LEN);
	let h = &msg.header;
	for v in [h.id, h.flags, h.qdcount, h.ancount, h.nscount, h.arcount] {
		out.extend_from_slice(&v.to_be_bytes());
	}
	if include_question {
		for q in &msg.questions {
			encode_name(&q.qname, &mut out);
			out.extend_from_slice(&q.qtype.to_be_bytes());
			out.extend_from_slice(&q.qclass.to_be_bytes());
		}
	}
	if include_answer {
		for a in &msg.answers {
			encode_name(&a.name, &mut out);
			out.extend_from_slice(&a.rtype.to_be_bytes());
			out.extend_from_slice(&a.class.to_be_bytes());
			out.extend_from_slice(&a.ttl.to_be_bytes());
			out.extend_from_slice(&4u16.to_be_bytes());
			out.extend_from_slice(&a.rdata.octets());
		}
	}
	out
}

pub fn decode(
	buf: &[u8],
	include_question: bool,
	include_answer: bool,
) -> Result<Message, ParseError> {
	let mut cur = Cursor::new(buf);
	let header = Header {
		id: cur.read_u16()?,
		flags: cur.read_u16()?,
		qdcount: cur.read_u16()?,
		ancount: cur.read_u16()?,
		nscount: cur.read_u16()?,
		arcount: cur.read_u16()?,
	};

	// some senders pad the header with stray null bytes; skip them before
	// section parsing, their absence is not an error
	if include_question || include_answer {
		while cur.peek() == Some(0) {
			cur.advance(1);
		}
	}

	let mut msg = Message {
		header,
		..Default::default()
	};

	if include_question {
		for _ in 0..header.qdcount {
			msg.questions.push(Question {
				qname: decode_name(&mut cur)?,
				qtype: cur.read_u16()?,
				qclass: cur.read_u16()?,
			});
		}
	}

	if include_answer {
		for _ in 0..header.ancount {
			let name = decode_name(&mut cur)?;
			let rtype = cur.read_u16()?;
			let class = cur.read_u16()?;
			let ttl = cur.read_u32()?;
			let rdlength = cur.read_u16()?;
			if rdlength != 4 {
				return Err(ParseError::UnsupportedRdata(rdlength));
			}
			msg.answers.push(Answer {
				name,
				rtype,
				class,
				ttl,
				rdata: Ipv4Addr::from(cur.read_u32()?),
			});
		}
	}

	Ok(msg)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn header_example_bytes() {
		let msg = Message {
			header: Header {
				id: 0x1234,
				flags: 0x0100,
				qdcount: 1,
				..Default::default()
			},
			..Default::default()
		};
		let buf = encode(&msg, false, false);
		assert_eq!(
			buf,
			[0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
		);

		let back = decode(&buf, false, false).unwrap();
		assert_eq!(back.header.id, 0x1234);
		assert_eq!(back.header.flags, 0x0100);
		assert_eq!(back.header.qdcount, 1);
	}

	#[test]
	fn name_roundtrip() {
		for name in ["example.com", "a.b.c.d", "x", "some-host.sub.example.org"] {
			let mut buf = Vec::new();
			encode_name(name, &mut buf);
			let mut cur = Cursor::new(&buf);
			assert_eq!(decode_name(&mut cur).unwrap(), name);
			assert_eq!(cur.pos(), buf.len());
		}
	}

	#[test]
	fn name_encode_drops_empty_labels() {
		let mut buf = Vec::new();
		encode_name(".example.com.", &mut buf);
		let mut cur = Cursor::new(&buf);
		assert_eq!(decode_name(&mut cur).unwrap(), "example.com");
	}

	#[test]
	fn message_roundtrip() {
		let msg = Message {
			header: Header {
				id: 0xbeef,
				flags: 0x8180,
				qdcount: 2,
				ancount: 1,
				..Default::default()
			},
			questions: vec![Question::a("a.com"), Question::a("b.com")],
			answers: vec![Answer {
				name: "a.com".to_string(),
				rtype: TYPE_A,
				class: CLASS_IN,
				ttl: 300,
				rdata: Ipv4Addr::new(1, 2, 3, 4),
			}],
		};
		let buf = encode(&msg, true, true);
		let back = decode(&buf, true, true).unwrap();
		assert_eq!(back, msg);
	}

	#[test]
	fn compression_pointer_resolves_to_question_name() {
		// question name at offset 12, answer name is a pointer to it
		let q = Message {
			header: Header {
				id: 1,
				flags: 0x8180,
				qdcount: 1,
				ancount: 1,
				..Default::default()
			},
			questions: vec![Question::a("example.com")],
			..Default::default()
		};
		let mut buf = encode(&q, true, false);
		let ptr: u16 = 0xC000 | DNS_HEADER_LEN as u16;
		buf.extend_from_slice(&ptr.to_be_bytes());
		buf.extend_from_slice(&TYPE_A.to_be_bytes());
		buf.extend_from_slice(&CLASS_IN.to_be_bytes());
		buf.extend_from_slice(&60u32.to_be_bytes());
		buf.extend_from_slice(&4u16.to_be_bytes());
		buf.extend_from_slice(&[8, 8, 8, 8]);

		let back = decode(&buf, true, true).unwrap();
		assert_eq!(back.questions[0].qname, "example.com");
		assert_eq!(back.answers[0].name, "example.com");
		assert_eq!(back.answers[0].rdata, Ipv4Addr::new(8, 8, 8, 8));
		assert_eq!(back.answers[0].ttl, 60);
	}

	#[test]
	fn pointer_cycle_is_rejected() {
		// name at offset 12 is a pointer to itself
		let mut buf = vec![0u8; DNS_HEADER_LEN];
		buf[4..6].copy_from_slice(&1u16.to_be_bytes()); // qdcount
		buf.extend_from_slice(&[0xC0, 0x0C]);
		buf.extend_from_slice(&TYPE_A.to_be_bytes());
		buf.extend_from_slice(&CLASS_IN.to_be_bytes());
		assert_eq!(decode(&buf, true, false), Err(ParseError::PointerLoop));
	}

	#[test]
	fn pointer_past_end_is_truncated_not_panic() {
		let mut buf = vec![0u8; DNS_HEADER_LEN];
		buf[4..6].copy_from_slice(&1u16.to_be_bytes());
		buf.extend_from_slice(&[0xC3, 0xFF]); // offset 0x3FF, way past the end
		buf.extend_from_slice(&[0, 1, 0, 1]);
		assert!(matches!(
			decode(&buf, true, false),
			Err(ParseError::Truncated { .. })
		));
	}

	#[test]
	fn lying_qdcount_is_contained() {
		// qdcount claims 5 but only one question is present
		let msg = Message {
			header: Header {
				id: 9,
				qdcount: 5,
				..Default::default()
			},
			questions: vec![Question::a("example.com")],
			..Default::default()
		};
		let buf = encode(&msg, true, false);
		assert!(matches!(
			decode(&buf, true, false),
			Err(ParseError::Truncated { .. })
		));
	}

	#[test]
	fn truncated_header_is_an_error() {
		assert!(matches!(
			decode(&[0x12, 0x34, 0x01], false, false),
			Err(ParseError::Truncated { .. })
		));
	}

	#[test]
	fn non_a_rdata_is_rejected() {
		let msg = Message {
			header: Header {
				id: 2,
				ancount: 1,
				..Default::default()
			},
			answers: vec![Answer {
				name: "example.com".to_string(),
				rtype: TYPE_A,
				class: CLASS_IN,
				ttl: 60,
				rdata: Ipv4Addr::new(8, 8, 8, 8),
			}],
			..Default::default()
		};
		let mut buf = encode(&msg, false, true);
		// corrupt rdlength (4 -> 16)
		let at = buf.len() - 6;
		buf[at..at + 2].copy_from_slice(&16u16.to_be_bytes());
		assert_eq!(
			decode(&buf, false, true),
			Err(ParseError::UnsupportedRdata(16))
		);
	}
}
