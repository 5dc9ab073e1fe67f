use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve(ServeArgs),
    Push,
    Help,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeArgs {
    pub bind: Option<String>,
    pub push_every: Option<u64>,
}

/// Parse arguments after the program name.
///
/// Supported forms:
///   cj-dashboard
///   cj-dashboard serve [--bind 127.0.0.1:8080] [--push-every 60]
///   cj-dashboard push
///   cj-dashboard help
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(first) = args.first() else {
        return Ok(Command::Serve(ServeArgs::default()));
    };

    match first.as_str() {
        "serve" => parse_serve_args(&args[1..]).map(Command::Serve),
        "push" => {
            if let Some(extra) = args.get(1) {
                bail!("Unexpected argument to push: {extra}");
            }
            Ok(Command::Push)
        }
        "help" | "-h" | "--help" => Ok(Command::Help),
        // Flags without a command mean `serve`
        flag if flag.starts_with("--") => parse_serve_args(args).map(Command::Serve),
        other => bail!("Unknown command: {other}\n\nRun `cj-dashboard help` for usage."),
    }
}

fn parse_serve_args(args: &[String]) -> Result<ServeArgs> {
    let mut parsed = ServeArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for --bind");
                };
                parsed.bind = Some(value.clone());
            }
            "--push-every" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for --push-every");
                };
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("--push-every expects seconds, got {value:?}"))?;
                if secs == 0 {
                    bail!("--push-every must be at least 1 second");
                }
                parsed.push_every = Some(secs);
            }
            other => bail!("Unknown option for serve: {other}"),
        }
        i += 1;
    }

    Ok(parsed)
}

pub fn print_help() {
    println!("cj-dashboard: tech debt and idle PBI dashboard for the Customer Journey board\n");
    println!("USAGE:");
    println!("  cj-dashboard                 Serve the dashboard (same as `serve`)");
    println!("  cj-dashboard serve [OPTIONS] Serve the dashboard");
    println!("  cj-dashboard push            Push the tech debt chart to the broadcast channel once");
    println!();
    println!("SERVE OPTIONS:");
    println!("  -b, --bind <addr>        Listen address (default 0.0.0.0:5000)");
    println!("  --push-every <secs>      Also push the chart on this interval");
    println!();
    println!("CONFIGURATION:");
    println!("  ~/.cj-dashboard/config.toml (or $CJ_DASHBOARD_CONFIG), .env, then environment:");
    println!("  JIRA_SERVER JIRA_USERNAME JIRA_PASSWORD JIRA_BOARD");
    println!("  PUSHER_APP_ID PUSHER_KEY PUSHER_SECRET PUSHER_CLUSTER");
    println!("  DASHBOARD_BIND DASHBOARD_PUSH_INTERVAL_SECS DASHBOARD_LOG_FORMAT RUST_LOG");
}
