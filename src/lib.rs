// minimal dns forwarder
// it does 3 things only:
// 	parse a client query
// 	relay each question to an upstream resolver (A/IN only)
// 	write a synthesized response back

pub mod constants;
pub mod msg;
pub mod resolver;
pub mod server;
pub mod wire;

pub use msg::{Answer, Header, Message, Question};
pub use resolver::{resolve, Upstream};
pub use server::Server;
pub use wire::ParseError;
