//! s3-upload CLI
//!
//! Uploads local files straight to object storage through a signing server.

use bytesize::ByteSize;
use clap::{Arg, ArgAction, Command};
use s3_upload::{FileDescriptor, SessionState, UploadConfig, UploadCoordinator};

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

fn pairs(matches: &clap::ArgMatches, id: &str) -> Result<Vec<(String, String)>, String> {
    matches
        .get_many::<String>(id)
        .into_iter()
        .flatten()
        .map(|raw| parse_pair(raw))
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("s3-upload")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Upload files directly to object storage using signed POST policies")
        .arg(
            Arg::new("files")
                .help("Files to upload")
                .required(true)
                .num_args(1..),
        )
        .arg(
            Arg::new("signing-url")
                .long("signing-url")
                .help("Signing endpoint, absolute or relative to --base-url"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("Base URL a relative signing endpoint is resolved against"),
        )
        .arg(
            Arg::new("param")
                .long("param")
                .help("Extra signing query parameter (KEY=VALUE)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("header")
                .long("header")
                .help("Header for the signing request (KEY=VALUE)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("upload-header")
                .long("upload-header")
                .help("Header for the storage POST, replaces the default ACL header (KEY=VALUE)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("max-concurrent")
                .long("max-concurrent")
                .help("Upload at most N files at once")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = UploadConfig::from_env()?;

    if let Some(url) = matches.get_one::<String>("signing-url") {
        config = config.signing_url(url);
    }
    if let Some(url) = matches.get_one::<String>("base-url") {
        config = config.base_url(url);
    }
    if let Some(max) = matches.get_one::<usize>("max-concurrent") {
        config = config.max_concurrent_uploads(*max);
    }
    for (key, value) in pairs(&matches, "param")? {
        config = config.signing_url_query_param(key, value);
    }
    for (key, value) in pairs(&matches, "header")? {
        config = config.signing_url_header(key, value);
    }
    for (key, value) in pairs(&matches, "upload-header")? {
        config = config.upload_request_header(key, value);
    }
    config.validate()?;

    let mut files = Vec::new();
    for path in matches.get_many::<String>("files").into_iter().flatten() {
        let file = FileDescriptor::from_path(path).await?;
        println!(
            "{} ({}, {})",
            file.name,
            file.content_type,
            ByteSize::b(file.size())
        );
        files.push(file);
    }

    let config = config
        .files(files)
        .on_progress(|percent, status| println!("  {:>3}% {}", percent, status))
        .on_error(|error| eprintln!("  error: {}", error))
        .on_finish(|result| {
            println!(
                "  uploaded: {}",
                result.public_url.as_deref().unwrap_or(&result.key)
            )
        });

    let coordinator = UploadCoordinator::start(config)?;
    let states = coordinator.wait().await;

    let done = states.iter().filter(|s| **s == SessionState::Done).count();
    println!("{} of {} file(s) uploaded", done, states.len());

    if done != states.len() {
        std::process::exit(1);
    }

    Ok(())
}
