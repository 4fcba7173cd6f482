use std::{future::Future, io, net::ToSocketAddrs, time::Duration};

use hickory_proto::op::Message;
use log::*;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::{net::UdpSocket, select, sync::oneshot, time::timeout};

use crate::{
	address::{AddressProvider, AddressSource},
	config::Config,
	error::{Error, Result},
	resolver::ResolverEntries,
	responder::Responder,
};

// an idle receive is abandoned and retried after this long
pub const RECV_TIMEOUT: Duration = Duration::from_millis(3050);

const RECV_BUF_LEN: usize = 0x600;

pub async fn run<S: AddressSource>(
	config: &Config,
	source: S,
	quit_signal: oneshot::Receiver<()>,
) -> Result<()> {
	let s = bind(&config.bind_host, config.bind_port)?;
	let local = s.local_addr().map_err(|source| Error::Bind {
		addr: format!("{}:{}", config.bind_host, config.bind_port),
		source,
	})?;
	info!("listening on UDP {}", local);
	println!("listening on {}", local);

	let mut responder = Responder::new(
		AddressProvider::new(source, config.address, config.ttl),
		config.response_ttl,
	);
	// refuse to serve without something to answer with
	let addr = responder.provider_mut().current()?;
	debug!("ready to reply to incoming requests with {addr}");

	let _resolvers = if config.resolver {
		ResolverEntries::write_all(&config.resolver_dir, &config.domains, local)?
	} else {
		ResolverEntries::default()
	};

	serve(&s, &mut responder, quit_signal).await
}

pub fn bind(host: &str, port: u16) -> Result<UdpSocket> {
	let bind_err = |source| Error::Bind {
		addr: format!("{host}:{port}"),
		source,
	};
	let addr = (host, port)
		.to_socket_addrs()
		.map_err(bind_err)?
		.next()
		.ok_or_else(|| {
			bind_err(std::io::Error::new(
				std::io::ErrorKind::AddrNotAvailable,
				"host resolves to no address",
			))
		})?;
	debug!("attempting to bind to {addr}");
	let s = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
		.map_err(bind_err)?;
	s.set_nonblocking(true).map_err(bind_err)?;
	s.bind(&addr.into()).map_err(bind_err)?;
	UdpSocket::from_std(s.into()).map_err(bind_err)
}

pub async fn serve<S: AddressSource>(
	s: &UdpSocket,
	responder: &mut Responder<S>,
	quit_signal: oneshot::Receiver<()>,
) -> Result<()> {
	serve_with_timeout(s, responder, quit_signal, RECV_TIMEOUT).await
}

// per-datagram failures never leave this loop, only the quit signal
// or an address that can no longer be determined do
pub async fn serve_with_timeout<S: AddressSource>(
	s: &UdpSocket,
	responder: &mut Responder<S>,
	mut quit_signal: oneshot::Receiver<()>,
	recv_timeout: Duration,
) -> Result<()> {
	let mut buf = vec![0u8; RECV_BUF_LEN];
	loop {
		select! {
			r = timeout(recv_timeout, s.recv_from(&mut buf)) => {
				let (len, addr) = match r {
					Ok(Ok(v)) => v,
					Ok(Err(e)) => {
						warn!("udp recv error: {}", e);
						continue;
					}
					Err(_) => {
						trace!("udp recv timed out");
						continue;
					}
				};
				trace!("udp recv {} bytes from {}", len, addr);
				let Some(resp) = responder.respond(&buf[..len])? else {
					continue;
				};
				trace_response(&resp);
				match s.send_to(&resp, addr).await {
					Ok(len) => trace!("udp send {} bytes to {}", len, addr),
					Err(e) => warn!("udp send to {} error: {}", addr, e),
				}
			}
			// to my surprise, &mut works
			_ = &mut quit_signal => {
				info!("exiting");
				return Ok(());
			}
		}
	}
}

// ctrl-c, or SIGTERM too on unix
// handlers are installed right away, the future resolves to the signal's name
pub fn shutdown_signal() -> io::Result<impl Future<Output = &'static str> + Send> {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{signal, SignalKind};

		let mut interrupt = signal(SignalKind::interrupt())?;
		let mut terminate = signal(SignalKind::terminate())?;
		Ok(async move {
			select! {
				_ = interrupt.recv() => "SIGINT",
				_ = terminate.recv() => "SIGTERM",
			}
		})
	}
	#[cfg(not(unix))]
	{
		Ok(async {
			match tokio::signal::ctrl_c().await {
				Ok(()) => "ctrl-c",
				Err(e) => {
					error!("unable to listen for ctrl-c: {}", e);
					std::future::pending().await
				}
			}
		})
	}
}

fn trace_response(resp: &[u8]) {
	if !log_enabled!(Level::Trace) {
		return;
	}
	match Message::from_vec(resp) {
		Ok(m) => trace!("dns response: {}", m),
		Err(e) => trace!("dns response doesn't parse: {}", e),
	}
}
