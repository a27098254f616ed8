use std::{io, net::SocketAddr, time::Duration};

use clap::Parser;
use log::*;
use tokio::{signal::ctrl_c, sync::oneshot, task};

use dnsfwd::Server;

#[derive(Parser)]
struct Args {
	/// upstream dns server every question is forwarded to
	#[clap(long)]
	resolver: SocketAddr,

	#[clap(short, long, default_value = "0.0.0.0:2053")]
	listen: SocketAddr,

	/// seconds to wait for each upstream reply
	#[clap(long, default_value_t = 5)]
	upstream_timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
	let args = Args::parse();

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	// socket create/bind failure is the only fatal path, exit code 1
	let server = Server::bind(
		args.listen,
		args.resolver,
		Duration::from_secs(args.upstream_timeout),
	)
	.await?;

	let (quit_tx, quit) = oneshot::channel();
	task::spawn(async move {
		if ctrl_c().await.is_ok() {
			info!("ctrl-c received, shutting down");
			let _ = quit_tx.send(());
		}
	});

	// a recv error terminates the loop, not the exit status
	server.run(quit).await;
	Ok(())
}
