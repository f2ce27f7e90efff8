use std::{env, fs, path::PathBuf};

fn shared_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(--concurrency <NUM> "Articles processed concurrently per batch").global(true))
        .arg(clap::arg!(--pacing_ms <MS> "Delay between batches in milliseconds").global(true))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").global(true))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").global(true))
        .arg(clap::arg!(--proxy <PREFIX> "Image proxy prefix for hotlink-protected hosts").global(true))
        .arg(
            clap::arg!(--config <FILE> "Configuration file")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .global(true),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let feed = clap::Command::new("feed")
        .about("Generate a feed from a built-in source")
        .arg(
            clap::arg!(<SOURCE> "Source name")
                .value_parser(["aliyun-blog", "aliyun", "infoq-topic", "infoq", "wordpress", "wp"]),
        )
        .arg(clap::arg!([ARG] "Source argument: topic id or alias, posts API URL"))
        .arg(clap::arg!(-l --limit <N> "Maximum number of articles"))
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format")
                .default_value("rss")
                .value_parser(["rss", "json"]),
        )
        .arg(clap::arg!(--pretty "Pretty print JSON output"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        );

    let decode = clap::Command::new("decode")
        .about("Detect, decode, render and sanitize a local payload")
        .arg(clap::arg!(<INPUT> "Local file, or '-' for stdin").value_parser(clap::value_parser!(std::path::PathBuf)))
        .arg(clap::arg!(--assignment <OBJ_FIELD> "Assignment carrying the body, as OBJECT.FIELD"))
        .arg(clap::arg!(--field <PTR> "JSON pointer of the content field"))
        .arg(clap::arg!(--container <SELECTOR> "CSS selector of the container holding the body"))
        .arg(clap::arg!(--base <URL> "Base URL for resolving relative links"))
        .arg(clap::arg!(--json_rewrap "Unescape literals by re-parsing them as JSON strings"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        );

    let mut cmd = shared_args(
        clap::Command::new("syndic")
            .version(env!("CARGO_PKG_VERSION"))
            .author("Syndic Contributors")
            .about("Build full-content syndication feeds"),
    )
    .subcommand_required(true)
    .subcommand(feed)
    .subcommand(decode);

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "syndic", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "syndic", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "syndic", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "syndic", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
