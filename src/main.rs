use std::process::ExitCode;

use clap::Parser;
use log::*;
use tokio::sync::oneshot;

use devns::{server, Args, Config, SystemSource};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let args = Args::parse();

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
		.init();

	let config = Config::from(args);

	let signal = match server::shutdown_signal() {
		Ok(signal) => signal,
		Err(e) => {
			error!("unable to install signal handlers: {}", e);
			return ExitCode::FAILURE;
		}
	};
	let (quit_tx, quit) = oneshot::channel();
	tokio::spawn(async move {
		let name = signal.await;
		info!("{name} received, shutting down");
		let _ = quit_tx.send(());
	});

	match server::run(&config, SystemSource, quit).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{}", e);
			ExitCode::from(e.exit_code())
		}
	}
}
