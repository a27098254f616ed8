use std::io;

use log::*;
use thiserror::Error;

use crate::constants::*;
use crate::msg::{Answer, Header, Message, Question};
use crate::wire::{self, ParseError};

// one encoded query out, one decoded reply in; kept as a trait so the
// resolution logic is exercised in tests without touching a socket
#[allow(async_fn_in_trait)]
pub trait Upstream {
	async fn exchange(&mut self, query: &[u8]) -> io::Result<Vec<u8>>;
}

#[derive(Error, Debug)]
pub enum ResolveError {
	#[error("upstream exchange failed: {0}")]
	Exchange(#[from] io::Error),

	#[error("upstream reply unparsable: {0}")]
	Reply(#[from] ParseError),

	#[error("upstream reply carried no answer record")]
	NoAnswer,
}

// resolve one client query, strictly sequential: each question is forwarded
// and its reply collected before the next question is touched
//
// failure policy: any upstream failure (send/recv error, timeout, bad reply,
// empty answer section) fails the whole request with SERVFAIL rather than
// answering a subset
pub async fn resolve<U: Upstream>(query: &Message, upstream: &mut U) -> Message {
	let id = query.header.id;
	let opcode = query.header.opcode();

	if opcode != OPCODE_QUERY {
		debug!("opcode {} not implemented", opcode2str(opcode));
		return respond(query, RCODE_NOTIMP, Vec::new());
	}

	let mut answers = Vec::with_capacity(query.questions.len());
	for q in &query.questions {
		match forward_one(id, &q.qname, upstream).await {
			Ok(answer) => answers.push(answer),
			Err(e) => {
				warn!("resolving {} failed: {e}", q.qname);
				return respond(query, RCODE_SERVFAIL, Vec::new());
			}
		}
	}
	respond(query, RCODE_NOERROR, answers)
}

// build a fresh single-question recursive query, exchange it, and pull the
// first answer record out of the reply
async fn forward_one<U: Upstream>(
	id: u16,
	qname: &str,
	upstream: &mut U,
) -> Result<Answer, ResolveError> {
	let forward = Message {
		header: Header::query(id),
		questions: vec![Question::a(qname)],
		..Default::default()
	};
	let reply = upstream.exchange(&wire::encode(&forward, true, false)).await?;
	let reply = wire::decode(&reply, true, true)?;
	trace!("upstream reply:\n{reply}");
	reply
		.answers
		.into_iter()
		.next()
		.ok_or(ResolveError::NoAnswer)
}

// response sections are always rebuilt fresh: questions are re-created from
// the decoded names (forced to A/IN), never copied from client wire bytes
fn respond(query: &Message, rcode: u8, answers: Vec<Answer>) -> Message {
	let questions: Vec<Question> = query
		.questions
		.iter()
		.map(|q| Question::a(&q.qname))
		.collect();
	Message {
		header: Header::response(
			query.header.id,
			query.header.opcode(),
			rcode,
			questions.len() as u16,
			answers.len() as u16,
		),
		questions,
		answers,
	}
}
