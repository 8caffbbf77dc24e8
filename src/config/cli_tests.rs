//! Tests for CLI argument parsing.

use std::path::PathBuf;

use super::cli::{Cli, Command};

mod parsing {
    use super::*;
    use clap::Parser;

    #[test]
    fn no_args_defaults_to_run() {
        let cli = Cli::parse_from_iter(["hourmeter"]);

        assert!(cli.command.is_none());
        assert_eq!(cli.command(), Command::Run);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_runtime_options() {
        let cli = Cli::parse_from_iter([
            "hourmeter",
            "--store-file",
            "/var/lib/hourmeter/settings.bin",
            "--lock-timeout-ms",
            "250",
            "--poll-interval-ms",
            "20",
            "--telemetry-period",
            "4",
            "--reclaim",
            "5",
            "-v",
        ]);

        assert_eq!(
            cli.store_file,
            Some(PathBuf::from("/var/lib/hourmeter/settings.bin"))
        );
        assert_eq!(cli.lock_timeout_ms, Some(250));
        assert_eq!(cli.poll_interval_ms, Some(20));
        assert_eq!(cli.telemetry_period, Some(4));
        assert_eq!(cli.reclaim, Some(5));
        assert!(cli.verbose);
    }

    #[test]
    fn reclaim_rejects_out_of_range_address() {
        let result = Cli::try_parse_from(["hourmeter", "--reclaim", "256"]);
        assert!(result.is_err());
    }

    #[test]
    fn config_short_flag() {
        let cli = Cli::parse_from_iter(["hourmeter", "-c", "hourmeter.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("hourmeter.toml")));
    }
}

mod subcommands {
    use super::*;

    #[test]
    fn show_with_json() {
        let cli = Cli::parse_from_iter(["hourmeter", "show", "--json"]);
        assert_eq!(cli.command(), Command::Show { json: true });
    }

    #[test]
    fn set_address_takes_positional_value() {
        let cli = Cli::parse_from_iter(["hourmeter", "set-address", "37"]);
        assert_eq!(cli.command(), Command::SetAddress { address: 37 });
    }

    #[test]
    fn reset_command() {
        let cli = Cli::parse_from_iter(["hourmeter", "reset"]);
        assert_eq!(cli.command(), Command::Reset);
    }

    #[test]
    fn global_store_file_after_subcommand() {
        let cli = Cli::parse_from_iter(["hourmeter", "show", "--store-file", "s.bin"]);
        assert_eq!(cli.store_file, Some(PathBuf::from("s.bin")));
    }

    #[test]
    fn init_default_output() {
        let cli = Cli::parse_from_iter(["hourmeter", "init"]);

        assert!(cli.is_init());
        assert_eq!(
            cli.command,
            Some(Command::Init {
                output: PathBuf::from("hourmeter.toml")
            })
        );
    }

    #[test]
    fn init_custom_output() {
        let cli = Cli::parse_from_iter(["hourmeter", "init", "-o", "custom.toml"]);
        assert_eq!(
            cli.command,
            Some(Command::Init {
                output: PathBuf::from("custom.toml")
            })
        );
    }

    #[test]
    fn run_is_not_init() {
        let cli = Cli::parse_from_iter(["hourmeter", "run"]);
        assert!(!cli.is_init());
        assert_eq!(cli.command(), Command::Run);
    }
}
