//! Tern type analyzer CLI.

use ternc::{
    check_files, load_rule_config, print_reports, print_rules, CheckCommandOptions,
};

use tern_diagnostic::RuleConfig;

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: tern check <file.ast.json>... [options]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --config=<path>     Rule severity table (JSON)");
                eprintln!("  --error-limit=<n>   Stop collecting after n errors per file");
                eprintln!("  --json              Emit diagnostics in the wire format");
                std::process::exit(2);
            }

            let mut options = CheckCommandOptions::default();
            let mut paths: Vec<String> = Vec::new();
            for arg in args.iter().skip(2) {
                if let Some(path) = arg.strip_prefix("--config=") {
                    options.config_path = Some(path.to_owned());
                } else if let Some(limit) = arg.strip_prefix("--error-limit=") {
                    match limit.parse::<usize>() {
                        Ok(n) => options.error_limit = n,
                        Err(_) => {
                            eprintln!("error: --error-limit expects a number, got {limit:?}");
                            std::process::exit(2);
                        }
                    }
                } else if arg == "--json" {
                    options.json = true;
                } else if arg.starts_with('-') {
                    eprintln!("error: unknown option {arg:?}");
                    std::process::exit(2);
                } else {
                    paths.push(arg.clone());
                }
            }

            if paths.is_empty() {
                eprintln!("error: no input files");
                std::process::exit(2);
            }

            let rules = match &options.config_path {
                Some(path) => match load_rule_config(path) {
                    Ok(rules) => rules,
                    Err(e) => {
                        eprintln!("error: {e}");
                        std::process::exit(2);
                    }
                },
                None => RuleConfig::default(),
            };

            let reports = check_files(&paths, &rules, &options);
            let code = print_reports(&reports, &options);
            std::process::exit(code);
        }
        "rules" => print_rules(),
        "--help" | "-h" | "help" => print_usage(),
        other => {
            eprintln!("error: unknown command {other:?}");
            print_usage();
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_usage() {
    println!("Tern type analyzer");
    println!();
    println!("Usage: tern <command> [arguments]");
    println!();
    println!("Commands:");
    println!("  check <file.ast.json>...   Analyze serialized syntax trees");
    println!("  rules                      List diagnostic rules and default severities");
}
