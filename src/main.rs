use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::io::IsTerminal;
use std::process;
use std::sync::Arc;

use hostsweep::{
    config::ReconConfig,
    engine::{ForwardResolver, ReconEngine, SpinnerReporter},
    output::{self, OutputConfig, OutputFormat, OutputManager},
    probes::{ProbeContext, ProbePlan, ProbeSelection},
    utils::{parse_addresses_simple, read_lines, resolve_domains},
};

fn build_cli() -> Command {
    Command::new("hostsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .author("ibrahimsql")
        .about("Find the hostnames behind IP addresses and the hosts behind domains")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("IP address or CIDR network to investigate")
                .index(1),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Line separated list of IP addresses or CIDR networks"),
        )
        .arg(
            Arg::new("domain")
                .short('d')
                .long("domain")
                .value_name("DOMAIN")
                .help("Target domain, or a file containing one domain per line"),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_name("N")
                .help("Number of concurrent workers [default: 100]")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Socket timeout for each probe in milliseconds [default: 500]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("server")
                .short('s')
                .long("server")
                .value_name("IP")
                .help("DNS server address [default: 8.8.8.8]"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Load settings from a TOML file instead of ~/.hostsweep.toml"),
        )
        .arg(
            Arg::new("parse")
                .long("parse")
                .value_name("FILE")
                .help("Re-render a JSON result file from a previous run"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write results to a file instead of stdout"),
        )
        .arg(flag("debug", "Log probe errors and results as they happen"))
        .arg(flag("validate", "Drop hostnames that are not valid domain names"))
        .arg(flag("fcrdns", "Keep only forward-confirmed hostnames"))
        .arg(flag("ipv6", "Look up AAAA records where applicable"))
        .arg(flag("reverse", "Reverse DNS (PTR) lookup for each IP"))
        .arg(flag("tls", "Collect names from the TLS certificate on port 443"))
        .arg(flag("headers", "Collect the Location header host over HTTP and HTTPS"))
        .arg(
            Arg::new("dictionary")
                .long("dictionary")
                .value_name("FILE")
                .help("Subdomain labels to try under each --domain"),
        )
        .arg(flag("ns", "Resolve the name servers of each --domain"))
        .arg(flag("mx", "Resolve the mail exchangers of each --domain"))
        .arg(flag("srv", "Resolve common SRV records of each --domain"))
        .arg(flag("clean", "Group hostnames under each IP"))
        .arg(flag("csv", "Comma separated output: hostname,ip,source"))
        .arg(flag("json", "JSON output"))
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help).action(ArgAction::SetTrue)
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("warn,hostsweep={}", level)),
    )
    .init();
}

/// File configuration with command line overrides applied
fn load_config(matches: &ArgMatches) -> anyhow::Result<ReconConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ReconConfig::from_toml_file(path)?,
        None => ReconConfig::load_default_config(),
    };

    if let Some(concurrency) = matches.get_one::<usize>("concurrency") {
        config.concurrency = *concurrency;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.timeout = *timeout;
    }
    if let Some(server) = matches.get_one::<String>("server") {
        config.server = server.clone();
    }
    config.debug |= matches.get_flag("debug");
    config.validate |= matches.get_flag("validate");
    config.fcrdns |= matches.get_flag("fcrdns");
    config.ipv6 |= matches.get_flag("ipv6");

    config.validate()?;
    Ok(config)
}

fn output_manager(matches: &ArgMatches) -> OutputManager {
    let file = matches.get_one::<String>("output").cloned();
    let colored = file.is_none() && std::io::stdout().is_terminal();

    OutputManager::new(OutputConfig {
        format: OutputFormat::from_flags(
            matches.get_flag("json"),
            matches.get_flag("csv"),
            matches.get_flag("clean"),
        ),
        file,
        colored,
    })
}

/// Targets and selected probes from the command line
fn build_plan(matches: &ArgMatches) -> anyhow::Result<ProbePlan> {
    let mut lines: Vec<String> = Vec::new();
    if let Some(target) = matches.get_one::<String>("target") {
        lines.push(target.clone());
    }
    if let Some(input) = matches.get_one::<String>("input") {
        lines.extend(read_lines(input)?);
    }
    let ips = parse_addresses_simple(&lines)?;

    let domains = match matches.get_one::<String>("domain") {
        Some(domain) => resolve_domains(domain)?,
        None => Vec::new(),
    };

    let dictionary = match matches.get_one::<String>("dictionary") {
        Some(path) => Some(read_lines(path)?),
        None => None,
    };

    let selection = ProbeSelection {
        reverse: matches.get_flag("reverse"),
        tls: matches.get_flag("tls"),
        headers: matches.get_flag("headers"),
        ns: matches.get_flag("ns"),
        mx: matches.get_flag("mx"),
        srv: matches.get_flag("srv"),
        dictionary,
    };

    let plan = ProbePlan::new(ips, domains, selection);
    plan.validate()?;
    Ok(plan)
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let output = output_manager(matches);

    if let Some(path) = matches.get_one::<String>("parse") {
        let records = output::load_results(path)?;
        output.write_results(&records).context("Error writing results")?;
        return Ok(());
    }

    let config = load_config(matches)?;
    let plan = build_plan(matches)?;

    let ctx = ProbeContext::from_config(&config)?;
    let forward: Option<Arc<dyn ForwardResolver>> = if config.fcrdns {
        Some(ctx.resolver.clone())
    } else {
        None
    };

    let mut engine = ReconEngine::new(&config, forward)?;
    if !config.debug {
        engine = engine.with_reporter(Arc::new(SpinnerReporter::new()));
    }

    let probes = plan.build(&ctx).await;
    let run = engine.run(probes).await?;
    log::info!(
        "{} probes produced {} unique records in {:.2?}",
        run.probes,
        run.records.len(),
        run.duration
    );

    output.write_results(&run.records).context("Error writing results")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("debug"));

    if let Err(e) = run(&matches).await {
        eprintln!("{} {:#}", "[!]".bright_red().bold(), e);
        process::exit(1);
    }
}
