use clap::{
    Arg, ArgAction, ArgGroup, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("domain")
                .action(ArgAction::Append)
                .env("TLSPULSE_DOMAIN")
                .help("domain[:port] separated by commas")
                .long("domain")
                .short('d')
                .value_delimiter(',')
                .value_name("DOMAIN"),
        )
        .arg(
            Arg::new("file")
                .help("path to newline-delimited list of domains")
                .long("file")
                .short('f')
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .group(
            ArgGroup::new("targets")
                .args(["domain", "file"])
                .required(true)
                .multiple(false),
        )
        .arg(
            Arg::new("timeout")
                .default_value("5")
                .env("TLSPULSE_TIMEOUT")
                .help("network timeout in seconds")
                .long("timeout")
                .short('t')
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("insecure")
                .action(ArgAction::SetTrue)
                .help("skip verification of the cert chain and host name")
                .long("insecure")
                .short('i'),
        )
        .arg(
            Arg::new("timezone")
                .default_value("Local")
                .env("TLSPULSE_TIMEZONE")
                .help("time zone for datetime fields")
                .long("timezone")
                .long_help(
                    "Time zone for datetime fields:\n\n\
                    - Local: the system time zone (default)\n\
                    - any IANA name, e.g. UTC, Europe/Berlin, Asia/Tokyo",
                )
                .short('z')
                .value_name("TZ"),
        )
        .arg(
            Arg::new("log-level")
                .default_value("info")
                .env("TLSPULSE_LOG_LEVEL")
                .help("log levels: debug|info|warn|error")
                .long("log-level")
                .short('l')
                .value_name("LEVEL")
                .value_parser(["debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("concurrency")
                .env("TLSPULSE_CONCURRENCY")
                .help("maximum number of hosts inspected at once (default: logical CPUs)")
                .long("concurrency")
                .short('c')
                .value_name("N")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
}
