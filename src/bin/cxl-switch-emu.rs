//! Emulator process entry point: loads the YAML configuration, starts
//! the dispatcher thread, and runs until SIGINT (`SPEC_FULL.md` §4.6).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use cxl_switch_core::{config, Dispatcher, Switch, Transport};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "cxl-switch-emu", about = "CXL 2.0 switch management-plane emulator")]
struct Args {
    /// Path to the YAML switch configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local MCTP endpoint id this emulator responds as.
    #[arg(long, default_value_t = 1)]
    local_eid: u8,

    /// Size of the transport's response-buffer free pool.
    #[arg(long, default_value_t = 32)]
    buffer_pool: usize,
}

fn main() -> cxl_switch_core::CoreResult<()> {
    env_logger::init();
    let args = Args::parse();

    let switch = match &args.config {
        Some(path) => config::load(path)?,
        None => Switch::new(32, 4, 8),
    };
    let switch = Arc::new(switch);
    let transport = Arc::new(Transport::new(args.buffer_pool));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            info!("received SIGINT, stopping after in-flight requests complete");
            stop.store(true, Ordering::Relaxed);
        })
        .expect("failed to install SIGINT handler");
    }

    let dispatcher = Dispatcher::new(Arc::clone(&switch), Arc::clone(&transport), args.local_eid);
    let handle = std::thread::spawn(move || dispatcher.run(&stop));

    handle.join().expect("dispatcher thread panicked");
    Ok(())
}
