//! Frame daemon: loads the configuration named by `DRIVE_FRAME_CONFIG` and runs the display
//! cycle until the process is stopped.

// crates.io
use color_eyre::{Result, eyre::WrapErr};
use tracing_subscriber::EnvFilter;
// self
use drive_frame::{config::FrameConfig, cycle::FileSink};

fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let config = FrameConfig::from_env().wrap_err("Failed to load the frame configuration.")?;
	let transport = config.reqwest_transport().wrap_err("Failed to build the HTTP client.")?;
	let sink = FileSink::new(&config.frame_path, config.canvas);
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.wrap_err("Failed to start the async runtime.")?;

	runtime.block_on(async move {
		let mut cycle =
			config.build_cycle(transport, sink).wrap_err("Failed to wire the display cycle.")?;

		tracing::info!(interval = %cycle.interval(), "Display cycle started.");

		cycle.run().await;

		Ok::<_, color_eyre::Report>(())
	})
}
