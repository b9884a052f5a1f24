use std::env;
use std::error::Error;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process;

use interp_stub::cache;
use interp_stub::config::{self, Config};
use interp_stub::elf;
use interp_stub::error::{LaunchError, Result};
use interp_stub::launch::{self, LaunchPlan};
use interp_stub::link_chain;
use interp_stub::locate::{self, Resolution};
use interp_stub::origin;

fn main() {
    let config = Config::from_env();

    let mut args = env::args_os();
    let invocation = match args.next() {
        Some(arg0) => PathBuf::from(arg0),
        None => fail(env!("CARGO_PKG_NAME"), &LaunchError::MissingInvocation),
    };
    let forwarded: Vec<OsString> = args.collect();

    // Diagnostics carry the name we were invoked under, which is the
    // front-door link, not this crate.
    let program = invocation
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned());

    let plan = match build_plan(&config, &invocation, &forwarded) {
        Ok(plan) => plan,
        Err(error) => fail(&program, &error),
    };

    if config.debug {
        eprintln!("exec: {:?} {:?}", plan.program, plan.args);
    }

    // Point of no return. Reaching the lines after exec() means the
    // interpreter changed or lost its executable bit since the locator
    // probed it.
    if let Some(library_path) = &plan.library_path {
        env::set_var(config::LIBRARY_PATH_VAR, library_path);
    }
    let error = exec::Command::new(&plan.program).args(&plan.args).exec();
    eprintln!("{}: unable to execute {:?}: {}", program, plan.program, error);
    process::exit(126);
}

fn build_plan(config: &Config, invocation: &Path, forwarded: &[OsString]) -> Result<LaunchPlan> {
    let binary = link_chain::resolve(invocation, &config.cwd)?;
    if config.debug {
        eprintln!("binary: {}", binary.display());
    }

    let metadata = elf::extract(&binary)?;
    if config.debug {
        eprintln!(
            "interpreter: {:?}, search hint: {:?}",
            metadata.interpreter, metadata.search_hint
        );
    }

    let binary_dir = binary
        .parent()
        .unwrap_or_else(|| Path::new("/"))
        .to_path_buf();
    let expanded_hint =
        origin::expand(metadata.search_hint.as_deref(), &binary_dir.to_string_lossy());
    let cache_dirs = cache::enumerate(config)?;
    if config.debug {
        eprintln!(
            "search path: {:?}",
            locate::candidates(&binary_dir, &expanded_hint, &cache_dirs)
        );
    }

    let resolution = locate::locate(&binary, &metadata, &expanded_hint, &cache_dirs)?;
    if config.debug {
        match &resolution {
            Resolution::Embedded => eprintln!("resolved: embedded interpreter"),
            Resolution::Interpreter { path, .. } => eprintln!("resolved: {}", path.display()),
        }
    }

    Ok(launch::plan(resolution, &binary, forwarded, config))
}

fn fail(program: &str, error: &dyn Error) -> ! {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    eprintln!("{}: {}", program, message);
    process::exit(1);
}
