// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! scriptfetch CLI
//!
//! Sends a single request or runs a script against the `http` module.

use std::env;
use std::fs;
use std::process::ExitCode;

use scriptfetch::{HttpFacade, ScriptHost, ScriptHostConfig};

// The script host drives its own runtime, so main stays synchronous.
fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scriptfetch=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "send" => {
            if args.len() < 3 {
                eprintln!("Usage: scriptfetch send <url>");
                return ExitCode::from(1);
            }
            send_url(&args[2])
        }
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: scriptfetch run <script.js>");
                return ExitCode::from(1);
            }
            run_script(&args[2])
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("scriptfetch {}", scriptfetch::VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"scriptfetch - HTTP client facade for embedded scripts

USAGE:
    scriptfetch <COMMAND> [ARGS]

COMMANDS:
    send <url>          Send a GET request and print the result as JSON
    run <script.js>     Run a script with the http module and print its console output
    help                Show this help message
    version             Show version information

EXAMPLES:
    scriptfetch send https://example.com
    scriptfetch run fetch-status.js

Set RUST_LOG=scriptfetch=debug to trace redirects and cookies.
"#
    );
}

fn send_url(url: &str) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    let facade = HttpFacade::new();
    let outcome = match runtime.block_on(facade.send(url, None, None)) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Invalid request: {}", e);
            return ExitCode::from(1);
        }
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize result: {}", e);
            return ExitCode::from(1);
        }
    }

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn run_script(path: &str) -> ExitCode {
    let code = match fs::read_to_string(path) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            return ExitCode::from(1);
        }
    };

    let mut host = match ScriptHost::new(ScriptHostConfig::default()) {
        Ok(host) => host,
        Err(e) => {
            eprintln!("Failed to create script host: {}", e);
            return ExitCode::from(1);
        }
    };

    let result = host.execute(&code);

    for message in host.console_output() {
        println!("{}", message.message);
    }

    match result {
        Ok(serde_json::Value::Null) => ExitCode::SUCCESS,
        Ok(value) => {
            println!("=> {}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Script failed: {}", e);
            ExitCode::from(1)
        }
    }
}
