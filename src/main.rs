use std::path::PathBuf;
use std::process::ExitCode;
use twlearn::config::{Config, Mode};
use twlearn::{driver, rules_xml};

fn usage() -> &'static str {
    "usage:\n  twlearn run <config.toml>\n  twlearn list-rules <rules.t1x>"
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("{}", usage());
        return ExitCode::FAILURE;
    };

    let result = match command.as_str() {
        "run" => args.next().map(|p| run(PathBuf::from(p))),
        "list-rules" => args.next().map(|p| list_rules(PathBuf::from(p))),
        _ => None,
    };

    match result {
        Some(Ok(())) => ExitCode::SUCCESS,
        Some(Err(e)) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("{}", usage());
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: PathBuf) -> twlearn::Result<()> {
    let config = Config::load(&config_path)?;
    match config.mode {
        Mode::Mono => driver::learn_from_monolingual(&config),
        Mode::Parallel => driver::learn_from_parallel(&config),
    }
}

fn list_rules(rules_path: PathBuf) -> twlearn::Result<()> {
    let rules_doc = rules_xml::load(&rules_path)?;
    for line in driver::list_rules(&rules_doc) {
        println!("{line}");
    }
    Ok(())
}
