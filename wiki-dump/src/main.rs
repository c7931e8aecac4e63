use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

use wiki_dump::{DumpError, PageReader};

fn main() {
    if let Err(err) = run() {
        eprintln!("{}: {err}", env!("CARGO_PKG_NAME"));
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args();
    let program = args
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    let input = match args.next() {
        Some(flag) if is_help_flag(&flag) => {
            print_help(&program);
            return Ok(());
        }
        Some(flag) if is_version_flag(&flag) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(path) if path == "-" => Input::Stdin,
        Some(path) => Input::File(path),
        None => Input::Stdin,
    };

    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument: {extra}\n{}", usage(&program)));
    }

    let pages = match input {
        Input::Stdin => PageReader::new(io::stdin().lock()).collect::<Result<Vec<_>, _>>(),
        Input::File(path) => {
            let file =
                File::open(&path).map_err(|err| format!("failed to read '{path}': {err}"))?;
            PageReader::new(BufReader::new(file)).collect::<Result<Vec<_>, _>>()
        }
    }
    .map_err(describe)?;

    let json = serde_json::to_string_pretty(&pages)
        .map_err(|err| format!("failed to serialize JSON: {err}"))?;
    println!("{json}");
    Ok(())
}

enum Input {
    Stdin,
    File(String),
}

fn describe(err: DumpError) -> String {
    match err {
        DumpError::Io(err) => format!("failed to read dump: {err}"),
        malformed => malformed.to_string(),
    }
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn is_version_flag(arg: &str) -> bool {
    arg == "-V" || arg == "--version"
}

fn print_help(program: &str) {
    println!(
        "{}\n\nOptions:\n  -h, --help      Show this message\n  -V, --version   Print package version",
        usage(program)
    );
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [DUMP_FILE|-]\n\n\
         Provide a path to a MediaWiki XML export dump or '-' to read from stdin. \
         Pages are printed as a JSON array. When no argument is passed, stdin is used."
    )
}
