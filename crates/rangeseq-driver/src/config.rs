use core::num::{NonZeroU64, NonZeroUsize};

use anyhow::{Context, bail};
use clap::Parser;
use rangeseq::{ClientLoad, GeneratorKind, SequencerConfig};

/// Runtime configuration for the `rangeseq-driver` binary.
///
/// These settings control the shape of the sequencer under test and the load
/// put on it. All values are parsed from CLI arguments or environment
/// variables and are fixed for the whole run.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rangeseq-driver",
    version,
    about = "Drives concurrent clients through a range-based ID sequencer and audits the result"
)]
pub struct CliArgs {
    /// Number of workers in the round-robin pool.
    ///
    /// Each worker leases its own range, so this also bounds how many ranges
    /// can be partially used at once.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 3)]
    pub num_workers: usize,

    /// Number of IDs in every leased range.
    ///
    /// Small ranges force frequent rotations and are the best way to shake
    /// out races between callers and the rotating caller.
    ///
    /// Environment variable: `RANGE_SIZE`
    #[arg(long, env = "RANGE_SIZE", default_value_t = 5)]
    pub range_size: u64,

    /// Number of concurrent client threads.
    ///
    /// Environment variable: `NUM_CLIENTS`
    #[arg(long, env = "NUM_CLIENTS", default_value_t = 10)]
    pub num_clients: usize,

    /// Number of IDs each client requests, one call at a time.
    ///
    /// Environment variable: `CALLS_PER_CLIENT`
    #[arg(long, env = "CALLS_PER_CLIENT", default_value_t = 100)]
    pub calls_per_client: usize,

    /// Start of the first range handed out.
    ///
    /// Environment variable: `FIRST_ID`
    #[arg(long, env = "FIRST_ID", default_value_t = 0)]
    pub first_id: u64,

    /// Worker strategy: `rw-lock` or `non-blocking`.
    ///
    /// Environment variable: `GENERATOR_KIND`
    #[arg(long, env = "GENERATOR_KIND", default_value_t = GeneratorKind::NonBlocking)]
    pub kind: GeneratorKind,

    /// Exit with a non-zero status if the audit finds a violation.
    ///
    /// Environment variable: `STRICT`
    #[arg(long, env = "STRICT", default_value_t = false)]
    pub strict: bool,

    /// Print the full audit report to stdout as JSON.
    ///
    /// Environment variable: `JSON_REPORT`
    #[arg(long, env = "JSON_REPORT", default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub sequencer: SequencerConfig,
    pub load: ClientLoad,
    pub strict: bool,
    pub json: bool,
}

impl TryFrom<CliArgs> for DriverConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let Some(num_workers) = NonZeroUsize::new(args.num_workers) else {
            bail!("NUM_WORKERS must be greater than 0");
        };
        let Some(range_size) = NonZeroU64::new(args.range_size) else {
            bail!("RANGE_SIZE must be greater than 0");
        };
        if args.num_clients == 0 {
            bail!("NUM_CLIENTS must be greater than 0");
        }

        let load = ClientLoad::new(args.num_clients, args.calls_per_client);
        load.expected_ids().with_context(|| {
            format!(
                "NUM_CLIENTS ({}) * CALLS_PER_CLIENT ({}) overflows",
                args.num_clients, args.calls_per_client
            )
        })?;

        let initial_span = u64::try_from(args.num_workers)
            .ok()
            .and_then(|workers| workers.checked_mul(args.range_size))
            .and_then(|span| span.checked_add(args.first_id))
            .filter(|&end| end < u64::MAX);
        if initial_span.is_none() {
            bail!(
                "FIRST_ID ({}) leaves no room for {} initial ranges of {} ids",
                args.first_id,
                args.num_workers,
                args.range_size
            );
        }

        let sequencer = SequencerConfig::new(num_workers, range_size)
            .with_first_id(args.first_id)
            .with_kind(args.kind);

        Ok(Self {
            sequencer,
            load,
            strict: args.strict,
            json: args.json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<DriverConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("rangeseq-driver").chain(args.iter().copied()))?;
        DriverConfig::try_from(args)
    }

    #[test]
    fn defaults_match_reference_workload() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.sequencer.num_workers.get(), 3);
        assert_eq!(config.sequencer.range_size.get(), 5);
        assert_eq!(config.sequencer.first_id, 0);
        assert_eq!(config.sequencer.kind, GeneratorKind::NonBlocking);
        assert_eq!(config.load, ClientLoad::new(10, 100));
        assert!(!config.strict);
        assert!(!config.json);
    }

    #[test]
    fn parses_kind_and_flags() {
        let config = parse(&["--kind", "rw-lock", "--first-id", "1000", "--strict"]).unwrap();
        assert_eq!(config.sequencer.kind, GeneratorKind::RwLock);
        assert_eq!(config.sequencer.first_id, 1000);
        assert!(config.strict);
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(parse(&["--kind", "mutex"]).is_err());
    }

    #[test]
    fn rejects_zero_sizes() {
        for args in [
            &["--num-workers", "0"][..],
            &["--range-size", "0"][..],
            &["--num-clients", "0"][..],
        ] {
            assert!(parse(args).is_err(), "{args:?} should be rejected");
        }
    }

    #[test]
    fn rejects_overflowing_load() {
        let calls = usize::MAX.to_string();
        assert!(parse(&["--num-clients", "2", "--calls-per-client", &calls]).is_err());
    }

    #[test]
    fn rejects_first_id_without_room() {
        let first_id = (u64::MAX - 10).to_string();
        assert!(parse(&["--first-id", &first_id]).is_err());
    }
}
