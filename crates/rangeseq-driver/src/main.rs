#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, DriverConfig};
use rangeseq::{
    AtomicIdGenerator, AuditParams, GeneratorKind, IdGenerator, Sequencer, audit, drive,
};
use telemetry::init_telemetry;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<ExitCode> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DriverConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let sequencer = Sequencer::new(config.sequencer).context("failed to build sequencer")?;

    let started = Instant::now();
    let issued = drive(sequencer.balancer(), config.load).context("client run failed")?;
    let elapsed = started.elapsed();
    tracing::info!(
        ids = issued.len(),
        elapsed_us = elapsed.as_micros() as u64,
        "clients finished"
    );

    for (index, worker) in sequencer.balancer().workers().iter().enumerate() {
        tracing::debug!(
            index,
            worker = worker.worker_id(),
            range = %worker.current_range(),
            "final lease"
        );
    }

    let report = audit(issued, &AuditParams::new(&config.sequencer, &config.load));
    report.log();

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    tracing::info!("Done");

    if config.strict && !report.is_clean() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn log_startup_info(config: &DriverConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting sequencer run with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting sequencer run with {} {} workers, range size {}, {} clients x {} calls",
            config.sequencer.num_workers,
            config.sequencer.kind,
            config.sequencer.range_size,
            config.load.clients,
            config.load.calls_per_client
        );
    }

    if config.sequencer.kind == GeneratorKind::NonBlocking && !AtomicIdGenerator::is_lock_free() {
        tracing::warn!(
            "128-bit atomics are emulated with locks on this target; non-blocking workers will block"
        );
    }
}
