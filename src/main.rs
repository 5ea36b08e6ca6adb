use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::{error, info};
use serde_json::Value;
use std::ffi::OsString;
use std::path::PathBuf;

use tado_control::client::{ApiError, TadoClient};
use tado_control::config::{self, Config};
use tado_control::models::tado::{Termination, ZoneId};
use tado_control::output;
use tado_control::session::Credentials;
use tado_control::transport::Transport;

/// Command line client for the tado° API.
///
/// Credentials may come from TADO_USERNAME, TADO_PASSWORD and TADO_CLIENT_SECRET instead
/// of the options. Global options go before the subcommand.
#[derive(Parser)]
#[command(name = "tado", version)]
struct Cli {
    /// tado username
    #[arg(short, long, env = "TADO_USERNAME")]
    username: String,

    /// tado password
    #[arg(short, long, env = "TADO_PASSWORD", hide_env_values = true)]
    password: String,

    /// Client secret, required when TADO_AUTH_FLOW=client-secret
    #[arg(long, env = "TADO_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Formatted text for zones, devices, the current user and zone state; JSON otherwise.
    Plain,
    /// Pretty-printed JSON as returned by the API.
    Json,
}

#[derive(Args, Debug)]
struct ZoneArg {
    /// Zone ID
    #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..))]
    zone: i64,
}

impl ZoneArg {
    fn id(&self) -> ZoneId {
        ZoneId(self.zone)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tell me who the tado API thinks I am
    Whoami,
    /// Get home metadata
    Home,
    /// Get all zones
    Zones,
    /// Get all devices
    Devices,
    /// Get all users of the home
    Users,
    /// Get all mobile devices
    MobileDevices,
    /// Get the outdoor weather at the home
    Weather,
    /// Get installations
    Installations,
    /// Get active invitations
    Invitations,
    /// Get the capabilities of a zone
    Capabilities(ZoneArg),
    /// Get the current state of a zone
    State(ZoneArg),
    /// Get the early start setting of a zone
    EarlyStart(ZoneArg),
    /// Enable or disable early start for a zone
    SetEarlyStart {
        #[command(flatten)]
        zone: ZoneArg,
        /// true or false
        #[arg(long, action = ArgAction::Set)]
        enabled: bool,
    },
    /// Get the active schedule of a zone
    Schedule(ZoneArg),
    /// Set the temperature for a zone
    SetTemperature {
        #[command(flatten)]
        zone: ZoneArg,
        /// Temperature; below 5 turns heating off
        #[arg(short, long, allow_negative_numbers = true)]
        temperature: f64,
        /// MANUAL, AUTO or a duration in seconds
        #[arg(short = 'x', long, default_value = "MANUAL")]
        termination: Termination,
    },
    /// End manual control
    EndManualControl(ZoneArg),
}

/// Find `--env-file` before clap runs, so the file can supply env-backed options.
fn env_file_from_args(args: impl IntoIterator<Item = OsString>) -> Option<PathBuf> {
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            return args.next().map(PathBuf::from);
        }
        if let Some(s) = arg.to_str()
            && let Some(path) = s.strip_prefix("--env-file=")
        {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn show(
    result: Result<Value, ApiError>,
    format: OutputFormat,
    render: impl FnOnce(Value) -> Result<String, String>,
) -> Result<Option<String>, String> {
    let value = result.map_err(|e| e.to_string())?;
    match format {
        OutputFormat::Json => Ok(Some(pretty(&value))),
        OutputFormat::Plain => render(value).map(Some),
    }
}

fn show_json(result: Result<Value, ApiError>, format: OutputFormat) -> Result<Option<String>, String> {
    show(result, format, |v| Ok(pretty(&v)))
}

/// Mutations print nothing in plain mode.
fn mutate(result: Result<Value, ApiError>, format: OutputFormat) -> Result<Option<String>, String> {
    let value = result.map_err(|e| e.to_string())?;
    match format {
        OutputFormat::Json => Ok(Some(pretty(&value))),
        OutputFormat::Plain => Ok(None),
    }
}

fn pretty(value: &Value) -> String {
    let mut s = output::pretty(value);
    s.push('\n');
    s
}

fn execute<T: Transport>(client: &TadoClient<T>, command: Command, format: OutputFormat) -> Result<Option<String>, String> {
    match command {
        Command::Whoami => show(client.get_me(), format, output::user),
        Command::Home => show_json(client.get_home(), format),
        Command::Zones => show(client.get_zones(), format, output::zones),
        Command::Devices => show(client.get_devices(), format, output::devices),
        Command::Users => show_json(client.get_users(), format),
        Command::MobileDevices => show_json(client.get_mobile_devices(), format),
        Command::Weather => show_json(client.get_weather(), format),
        Command::Installations => show_json(client.get_installations(), format),
        Command::Invitations => show_json(client.get_invitations(), format),
        Command::Capabilities(z) => show_json(client.get_capabilities(z.id()), format),
        Command::State(z) => show(client.get_state(z.id()), format, |v| {
            output::zone_state(v, client.temperature_unit())
        }),
        Command::EarlyStart(z) => show_json(client.get_early_start(z.id()), format),
        Command::SetEarlyStart { zone, enabled } => mutate(client.set_early_start(zone.id(), enabled), format),
        Command::Schedule(z) => show_json(client.get_schedule(z.id()), format),
        Command::SetTemperature {
            zone,
            temperature,
            termination,
        } => mutate(client.set_temperature(zone.id(), temperature, termination), format),
        Command::EndManualControl(z) => {
            client.end_manual_control(z.id()).map_err(|e| e.to_string())?;
            Ok(None)
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (api={}, auth_flow={}, timeout={}s)",
        cfg.api_url,
        cfg.auth_flow,
        cfg.timeout.as_secs()
    );

    let mut credentials = Credentials::new(cli.username, cli.password);
    if let Some(secret) = cli.client_secret {
        credentials = credentials.with_client_secret(secret);
    }

    let client = TadoClient::connect(&cfg, credentials).map_err(|e| format!("login failed: {}", e))?;
    if let Some(text) = execute(&client, cli.command, cli.output)? {
        print!("{}", text);
    }
    Ok(())
}

fn main() {
    let loaded_env = match config::load_dotenv(env_file_from_args(std::env::args_os()).as_deref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("warn");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!(
            "Environment loaded from {} .env file: {} ({} variable(s) applied)",
            origin,
            info.path.display(),
            info.applied
        );
    }

    let cli = Cli::parse();
    info!(
        "tado {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );

    if let Err(e) = run(cli) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut full = vec!["tado", "-u", "user", "-p", "pass"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn set_temperature_defaults_to_manual() {
        let cli = parse(&["set-temperature", "-z", "3", "-t", "4"]).unwrap();
        match cli.command {
            Command::SetTemperature {
                zone,
                temperature,
                termination,
            } => {
                assert_eq!(zone.id(), ZoneId(3));
                assert_eq!(temperature, 4.0);
                assert_eq!(termination, Termination::Manual);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn set_temperature_termination_forms() {
        let cli = parse(&["set-temperature", "--zone", "1", "--temperature", "21.5", "-x", "AUTO"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::SetTemperature {
                termination: Termination::Auto,
                ..
            }
        ));

        let cli = parse(&["set-temperature", "-z", "1", "-t", "20", "-x", "900"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::SetTemperature {
                termination: Termination::Timer {
                    duration_in_seconds: 900
                },
                ..
            }
        ));

        assert!(parse(&["set-temperature", "-z", "1", "-t", "20", "-x", "later"]).is_err());
    }

    #[test]
    fn zone_commands_require_zone() {
        assert!(parse(&["state"]).is_err());
        assert!(parse(&["end-manual-control"]).is_err());
        assert!(parse(&["state", "-z", "0"]).is_err());
        assert!(parse(&["state", "--zone=-4"]).is_err());
        let cli = parse(&["end-manual-control", "-z", "2"]).unwrap();
        assert!(matches!(cli.command, Command::EndManualControl(ZoneArg { zone: 2 })));
    }

    #[test]
    fn early_start_takes_explicit_boolean() {
        let cli = parse(&["set-early-start", "-z", "1", "--enabled", "false"]).unwrap();
        assert!(matches!(cli.command, Command::SetEarlyStart { enabled: false, .. }));
        assert!(parse(&["set-early-start", "-z", "1", "--enabled", "maybe"]).is_err());
    }

    #[test]
    fn output_format_flag() {
        let cli = parse(&["-o", "json", "zones"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Zones));
        assert_eq!(parse(&["mobile-devices"]).unwrap().output, OutputFormat::Plain);
    }

    #[test]
    fn finds_env_file_argument() {
        let args = |v: &[&str]| v.iter().map(OsString::from).collect::<Vec<_>>();
        assert_eq!(
            env_file_from_args(args(&["tado", "--env-file", "prod.env", "zones"])),
            Some(PathBuf::from("prod.env"))
        );
        assert_eq!(
            env_file_from_args(args(&["tado", "--env-file=.env.local", "zones"])),
            Some(PathBuf::from(".env.local"))
        );
        assert_eq!(env_file_from_args(args(&["tado", "zones"])), None);
        assert_eq!(env_file_from_args(args(&["tado", "--", "--env-file", "x"])), None);
    }
}
