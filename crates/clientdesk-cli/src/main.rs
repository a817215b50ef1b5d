// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use clientdesk_app::{StaticAuth, UserId};
use clientdesk_remote::HttpStore;
use config::Config;
use runtime::Shell;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CLIENTDESK_LOG";
const DEMO_SEED: u64 = 20_260_101;
const DEMO_CLIENTS: usize = 23;
const DEMO_USER: UserId = UserId::new(1);

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    init_logging();

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `clientdesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let timing = config.form_timing()?;

    if options.demo {
        if options.check_only {
            return Ok(());
        }
        info!(clients = DEMO_CLIENTS, "starting demo session");
        let store = clientdesk_testkit::seeded_store(DEMO_SEED, DEMO_CLIENTS, DEMO_USER);
        let auth = StaticAuth::new("demo", DEMO_USER);
        return runtime::run_shell(Shell::new(store, auth, config.page_size(), timing));
    }

    let store = HttpStore::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [remote] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    let auth = config.auth().with_context(|| {
        format!(
            "invalid [auth] config in {}",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    info!(base_url = store.base_url(), "starting session");
    runtime::run_shell(Shell::new(store, auth, config.page_size(), timing))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("clientdesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Run against seeded in-memory clients");
    println!("  --check                  Validate config and remote settings, then exit");
    println!("  --help                   Show this help");
    println!();
    println!("  {LOG_ENV}=debug enables logging on stderr; {} sets the API token.", config::TOKEN_ENV);
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/clientdesk-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--print-path"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_demo_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--demo", "--check", "--print-example-config"],
            default_options_path(),
        )?;
        assert!(options.demo);
        assert!(options.check_only);
        assert!(options.print_example);
        assert!(!options.print_config_path);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        assert!(parse_cli_args(vec!["--help"], default_options_path())?.show_help);
        assert!(parse_cli_args(vec!["-h"], default_options_path())?.show_help);
        Ok(())
    }
}
