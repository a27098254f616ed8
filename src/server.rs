use std::{io, net::SocketAddr, time::Duration};

use log::*;
use tokio::{net::UdpSocket, select, sync::oneshot, time::timeout};

use crate::constants::MAX_MSG_LEN;
use crate::resolver::{resolve, Upstream};
use crate::wire;

// connected udp socket to the configured resolver, one bounded
// request/reply round-trip per exchange; no retry, a timeout is reported
// as an upstream failure
pub struct UdpUpstream {
	socket: UdpSocket,
	wait: Duration,
}

impl UdpUpstream {
	pub async fn connect(addr: SocketAddr, wait: Duration) -> io::Result<UdpUpstream> {
		let socket = UdpSocket::bind("0.0.0.0:0").await?;
		socket.connect(addr).await?;
		Ok(UdpUpstream { socket, wait })
	}
}

impl Upstream for UdpUpstream {
	async fn exchange(&mut self, query: &[u8]) -> io::Result<Vec<u8>> {
		self.socket.send(query).await?;
		let mut buf = vec![0u8; MAX_MSG_LEN];
		let len = timeout(self.wait, self.socket.recv(&mut buf))
			.await
			.map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "upstream timed out"))??;
		buf.truncate(len);
		Ok(buf)
	}
}

// explicitly constructed server value owning its socket and upstream; one
// client query is fully resolved and answered before the next is read
pub struct Server {
	socket: UdpSocket,
	upstream: UdpUpstream,
}

impl Server {
	pub async fn bind(
		listen: SocketAddr,
		resolver: SocketAddr,
		upstream_wait: Duration,
	) -> io::Result<Server> {
		let socket = UdpSocket::bind(listen).await?;
		let upstream = UdpUpstream::connect(resolver, upstream_wait).await?;
		info!("listening on UDP {}", socket.local_addr()?);
		info!("forwarding to {resolver}");
		Ok(Server { socket, upstream })
	}

	pub async fn run(mut self, mut quit_signal: oneshot::Receiver<()>) {
		let mut buf = vec![0u8; MAX_MSG_LEN];
		loop {
			select! {
				r = self.socket.recv_from(&mut buf) => {
					match r {
						Ok((len, addr)) => {
							trace!("udp recv {len} bytes from {addr}");
							let Some(resp) = self.handle(&buf[..len]).await else {
								continue;
							};
							match self.socket.send_to(&resp, addr).await {
								Ok(len) => {
									trace!("udp send {len} bytes to {addr}");
								}
								Err(e) => {
									error!("udp send error: {e}");
									break;
								}
							}
						}
						Err(e) => {
							error!("udp recv error: {e}");
							break;
						}
					}
				}
				_ = &mut quit_signal => {
					info!("exiting");
					break;
				}
			}
		}
	}

	// per-datagram: a packet that fails to parse is dropped, the loop goes on
	async fn handle(&mut self, datagram: &[u8]) -> Option<Vec<u8>> {
		let query = wire::decode(datagram, true, false)
			.map_err(|e| warn!("dropping malformed datagram: {e}"))
			.ok()?;
		trace!("dns query:\n{query}");

		let resp = resolve(&query, &mut self.upstream).await;
		trace!("dns response:\n{resp}");
		Some(wire::encode(&resp, true, true))
	}
}
