//! Test runner for interp-stub
//!
//! Validates the stub end to end by:
//! 1. Synthesizing ELF images with chosen PT_INTERP / DT_RPATH values
//! 2. Installing them under realistic package trees wired up with the
//!    two-level symlink convention the stub expects
//! 3. Running the real stub binary against those trees (argv[0] set to the
//!    front-door link), with the print-args demo standing in for resolved
//!    interpreters and directly launched targets
//! 4. Validating exit codes, stderr diagnostics, and the argv/environment
//!    the launched program actually received
//!
//! Usage: test-runner --stub <path> --print-args <path> [--work-dir <dir>]

use std::env;
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

/// Test configuration
struct TestConfig {
    /// Path to the interp-stub binary under test
    stub_path: PathBuf,
    /// Path to the print-args demo binary
    print_args_path: PathBuf,
    /// Working directory for test artifacts
    work_dir: PathBuf,
}

impl TestConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = env::args().collect();

        let mut stub_path = None;
        let mut print_args_path = None;
        let mut work_dir = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--stub" => {
                    i += 1;
                    stub_path = args.get(i).map(PathBuf::from);
                }
                "--print-args" => {
                    i += 1;
                    print_args_path = args.get(i).map(PathBuf::from);
                }
                "--work-dir" => {
                    i += 1;
                    work_dir = args.get(i).map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => return Err(format!("Unknown argument: {}", other)),
            }
            i += 1;
        }

        Ok(Self {
            stub_path: stub_path.ok_or("--stub is required")?,
            print_args_path: print_args_path.ok_or("--print-args is required")?,
            work_dir: work_dir.unwrap_or_else(|| env::temp_dir().join("interp-stub-tests")),
        })
    }
}

fn print_usage() {
    eprintln!("Usage: test-runner --stub <path> --print-args <path> [--work-dir <dir>]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  --stub <path>        interp-stub binary under test");
    eprintln!("  --print-args <path>  print-args demo binary");
    eprintln!("  --work-dir <dir>     scratch directory (default: <tmp>/interp-stub-tests)");
}

// --- Synthetic ELF images -------------------------------------------------
//
// A minimal ELF64 image: one PT_LOAD mapping the file at virtual address
// zero, a PT_INTERP naming the requested interpreter, and (when an RPATH is
// wanted) a PT_DYNAMIC with DT_STRTAB/DT_STRSZ/DT_RPATH. These images parse
// fine; only the stand-in interpreter actually runs.

fn synth_elf(interpreter: &str, rpath: Option<&str>) -> Vec<u8> {
    const PT_LOAD: u32 = 1;
    const PT_DYNAMIC: u32 = 2;
    const PT_INTERP: u32 = 3;
    const DT_NULL: u64 = 0;
    const DT_STRTAB: u64 = 5;
    const DT_STRSZ: u64 = 10;
    const DT_RPATH: u64 = 15;

    let phnum: u64 = if rpath.is_some() { 3 } else { 2 };
    let interp_off = 64 + phnum * 56;
    let strtab_off = interp_off + interpreter.len() as u64 + 1;
    let strtab_len = rpath.map_or(0, |hint| hint.len() as u64 + 2);
    let dynamic_off = (strtab_off + strtab_len + 7) & !7;
    let total = if rpath.is_some() {
        dynamic_off + 4 * 16
    } else {
        strtab_off
    };

    let mut image = Vec::with_capacity(total as usize);
    image.extend_from_slice(b"\x7fELF\x02\x01\x01\x00");
    image.extend_from_slice(&[0; 8]);
    le16(&mut image, 2); // ET_EXEC
    le16(&mut image, 62); // EM_X86_64
    le32(&mut image, 1);
    le64(&mut image, 0); // e_entry
    le64(&mut image, 64); // e_phoff
    le64(&mut image, 0); // e_shoff
    le32(&mut image, 0); // e_flags
    le16(&mut image, 64); // e_ehsize
    le16(&mut image, 56); // e_phentsize
    le16(&mut image, phnum as u16);
    le16(&mut image, 0); // e_shentsize
    le16(&mut image, 0); // e_shnum
    le16(&mut image, 0); // e_shstrndx

    phdr(&mut image, PT_LOAD, 5, 0, total, 0x1000);
    phdr(
        &mut image,
        PT_INTERP,
        4,
        interp_off,
        interpreter.len() as u64 + 1,
        1,
    );
    if rpath.is_some() {
        phdr(&mut image, PT_DYNAMIC, 6, dynamic_off, 4 * 16, 8);
    }

    image.extend_from_slice(interpreter.as_bytes());
    image.push(0);
    if let Some(hint) = rpath {
        image.push(0);
        image.extend_from_slice(hint.as_bytes());
        image.push(0);
        image.resize(dynamic_off as usize, 0);
        for (tag, value) in [
            (DT_STRTAB, strtab_off),
            (DT_STRSZ, strtab_len),
            (DT_RPATH, 1),
            (DT_NULL, 0),
        ] {
            le64(&mut image, tag);
            le64(&mut image, value);
        }
    }

    image
}

fn phdr(image: &mut Vec<u8>, p_type: u32, flags: u32, off: u64, size: u64, align: u64) {
    le32(image, p_type);
    le32(image, flags);
    le64(image, off); // p_offset
    le64(image, off); // p_vaddr
    le64(image, off); // p_paddr
    le64(image, size); // p_filesz
    le64(image, size); // p_memsz
    le64(image, align);
}

fn le16(image: &mut Vec<u8>, value: u16) {
    image.extend_from_slice(&value.to_le_bytes());
}

fn le32(image: &mut Vec<u8>, value: u32) {
    image.extend_from_slice(&value.to_le_bytes());
}

fn le64(image: &mut Vec<u8>, value: u64) {
    image.extend_from_slice(&value.to_le_bytes());
}

// --- Package trees --------------------------------------------------------

/// A relocatable package: the real binary under `pkg/bin`, its library
/// directory under `pkg/lib`, and the front-door symlink whose target is
/// the binary path plus the `.elf` extension the stub strips.
struct Package {
    binary: PathBuf,
    bin_dir: PathBuf,
    lib_dir: PathBuf,
    link: PathBuf,
}

fn install_package(
    test_dir: &Path,
    interpreter: &str,
    rpath: Option<&str>,
) -> Result<Package, String> {
    let bin_dir = test_dir.join("pkg").join("bin");
    let lib_dir = test_dir.join("pkg").join("lib");
    fs::create_dir_all(&bin_dir).map_err(|e| format!("Failed to create bin dir: {}", e))?;
    fs::create_dir_all(&lib_dir).map_err(|e| format!("Failed to create lib dir: {}", e))?;

    let binary = bin_dir.join("app");
    fs::write(&binary, synth_elf(interpreter, rpath))
        .map_err(|e| format!("Failed to write ELF image: {}", e))?;
    set_mode(&binary, 0o755)?;

    let link = link_front(test_dir, &binary)?;
    Ok(Package {
        binary,
        bin_dir,
        lib_dir,
        link,
    })
}

/// Creates `<test_dir>/front/app` pointing at `<binary>.elf`.
fn link_front(test_dir: &Path, binary: &Path) -> Result<PathBuf, String> {
    let front_dir = test_dir.join("front");
    fs::create_dir_all(&front_dir).map_err(|e| format!("Failed to create front dir: {}", e))?;
    let link = front_dir.join("app");
    let mut target = binary.to_path_buf().into_os_string();
    target.push(".elf");
    symlink(&target, &link).map_err(|e| format!("Failed to create front link: {}", e))?;
    Ok(link)
}

/// Installs the print-args demo as `<dir>/<name>`, the stand-in for a
/// bundled dynamic linker.
fn install_interpreter(config: &TestConfig, dir: &Path, name: &str) -> Result<PathBuf, String> {
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create dir: {}", e))?;
    let destination = dir.join(name);
    fs::copy(&config.print_args_path, &destination)
        .map_err(|e| format!("Failed to copy print-args: {}", e))?;
    set_mode(&destination, 0o755)?;
    Ok(destination)
}

fn set_mode(path: &Path, mode: u32) -> Result<(), String> {
    let mut permissions = fs::metadata(path)
        .map_err(|e| format!("Failed to get metadata: {}", e))?
        .permissions();
    permissions.set_mode(mode);
    fs::set_permissions(path, permissions).map_err(|e| format!("Failed to set permissions: {}", e))
}

// --- Driving the stub -----------------------------------------------------

/// Runs the stub with argv[0] set to `invoked_as`, the way the kernel would
/// when the front-door link points at the stub. The inherited library path
/// and debug toggle are cleared first so each test controls them.
fn run_stub(
    config: &TestConfig,
    invoked_as: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<(String, String, i32), String> {
    let mut command = Command::new(&config.stub_path);
    command.arg0(invoked_as);
    command.args(args);
    command.env_remove("LD_LIBRARY_PATH");
    command.env_remove("INTERP_STUB_DEBUG");
    for (name, value) in envs {
        command.env(name, value);
    }

    let output = command
        .output()
        .map_err(|e| format!("Failed to run stub: {}", e))?;
    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code().unwrap_or(-1),
    ))
}

/// Parses the JSON report print-args emits.
fn parse_report(stdout: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(stdout.trim())
        .map_err(|e| format!("Demo output is not JSON ({}): {:?}", e, stdout))
}

fn argv_of(report: &serde_json::Value) -> Result<Vec<String>, String> {
    report["argv"]
        .as_array()
        .ok_or_else(|| format!("Report has no argv array: {}", report))?
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(String::from)
                .ok_or_else(|| format!("Non-string argv entry: {}", report))
        })
        .collect()
}

fn test_dir(config: &TestConfig, name: &str) -> Result<PathBuf, String> {
    let dir = config.work_dir.join(name);
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create test dir: {}", e))?;
    Ok(dir)
}

// --- Tests ----------------------------------------------------------------

/// The bundled interpreter named by an $ORIGIN rpath is found and invoked
/// with the binary path prepended and the winning directory leading
/// LD_LIBRARY_PATH.
fn test_resolves_through_origin_hint(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: resolves_through_origin_hint");

    let dir = test_dir(config, "origin_hint")?;
    let package = install_package(&dir, "fake-ld.so", Some("$ORIGIN/../lib"))?;
    let interpreter = install_interpreter(config, &package.lib_dir, "fake-ld.so")?;

    let (stdout, stderr, exit_code) = run_stub(config, &package.link, &["--flag", "value"], &[])?;
    if exit_code != 0 {
        return Err(format!("Stub failed with exit code {}: {}", exit_code, stderr));
    }

    let report = parse_report(&stdout)?;
    let argv = argv_of(&report)?;
    let expected = vec![
        interpreter.to_string_lossy().into_owned(),
        package.binary.to_string_lossy().into_owned(),
        "--flag".to_string(),
        "value".to_string(),
    ];
    if argv != expected {
        return Err(format!("Unexpected argv {:?}, expected {:?}", argv, expected));
    }

    let library_path = report["library_path"].as_str().unwrap_or_default();
    if library_path != package.lib_dir.to_string_lossy() {
        return Err(format!(
            "Unexpected LD_LIBRARY_PATH {:?}, expected {:?}",
            library_path, package.lib_dir
        ));
    }

    println!("    PASS");
    Ok(())
}

/// With copies of the interpreter in both the binary's own directory and
/// the hint directory, the binary's own directory must win.
fn test_bundled_interpreter_shadows_hint(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: bundled_interpreter_shadows_hint");

    let dir = test_dir(config, "shadowing")?;
    let package = install_package(&dir, "fake-ld.so", Some("$ORIGIN/../lib"))?;
    install_interpreter(config, &package.lib_dir, "fake-ld.so")?;
    let colocated = install_interpreter(config, &package.bin_dir, "fake-ld.so")?;

    let (stdout, stderr, exit_code) = run_stub(config, &package.link, &[], &[])?;
    if exit_code != 0 {
        return Err(format!("Stub failed with exit code {}: {}", exit_code, stderr));
    }

    let report = parse_report(&stdout)?;
    let argv = argv_of(&report)?;
    if argv.first().map(String::as_str) != Some(&*colocated.to_string_lossy()) {
        return Err(format!(
            "Expected the co-located interpreter {:?} to win, argv was {:?}",
            colocated, argv
        ));
    }

    let library_path = report["library_path"].as_str().unwrap_or_default();
    if library_path != package.bin_dir.to_string_lossy() {
        return Err(format!(
            "Unexpected LD_LIBRARY_PATH {:?}, expected {:?}",
            library_path, package.bin_dir
        ));
    }

    println!("    PASS");
    Ok(())
}

/// A binary whose embedded interpreter needs no resolution is launched
/// directly, with its arguments and environment untouched.
fn test_embedded_interpreter_direct_launch(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: embedded_interpreter_direct_launch");

    let dir = test_dir(config, "direct_launch")?;
    let bin_dir = dir.join("pkg").join("bin");
    let binary = install_interpreter(config, &bin_dir, "app")?;
    let link = link_front(&dir, &binary)?;

    let (stdout, stderr, exit_code) = run_stub(config, &link, &["hello world", "it's"], &[])?;
    if exit_code != 0 {
        return Err(format!("Stub failed with exit code {}: {}", exit_code, stderr));
    }

    let report = parse_report(&stdout)?;
    let argv = argv_of(&report)?;
    let expected = vec![
        binary.to_string_lossy().into_owned(),
        "hello world".to_string(),
        "it's".to_string(),
    ];
    if argv != expected {
        return Err(format!("Unexpected argv {:?}, expected {:?}", argv, expected));
    }

    if !report["library_path"].is_null() {
        return Err(format!(
            "LD_LIBRARY_PATH should be untouched on the direct path: {}",
            report
        ));
    }

    println!("    PASS");
    Ok(())
}

/// Arguments with embedded whitespace and quote characters survive byte
/// for byte through the resolved-interpreter path.
fn test_argument_fidelity(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: argument_fidelity");

    let dir = test_dir(config, "fidelity")?;
    let package = install_package(&dir, "fake-ld.so", Some("$ORIGIN/../lib"))?;
    install_interpreter(config, &package.lib_dir, "fake-ld.so")?;

    let tricky = ["--label", "hello  world", "it's", "-x=a b\tc", "trail "];
    let (stdout, stderr, exit_code) = run_stub(config, &package.link, &tricky, &[])?;
    if exit_code != 0 {
        return Err(format!("Stub failed with exit code {}: {}", exit_code, stderr));
    }

    let argv = argv_of(&parse_report(&stdout)?)?;
    if argv.len() != tricky.len() + 2 {
        return Err(format!("Unexpected argv length: {:?}", argv));
    }
    if argv[2..] != tricky {
        return Err(format!("Arguments were altered: {:?}", &argv[2..]));
    }

    println!("    PASS");
    Ok(())
}

/// When no candidate directory holds the interpreter, the stub exits
/// nonzero, names the interpreter on stderr, and launches nothing.
fn test_missing_interpreter_diagnostic(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: missing_interpreter_diagnostic");

    let dir = test_dir(config, "missing_interp")?;
    let package = install_package(&dir, "absent-ld.so", Some("$ORIGIN/../lib"))?;

    let (stdout, stderr, exit_code) = run_stub(config, &package.link, &[], &[])?;
    if exit_code == 0 {
        return Err("Stub should have failed".to_string());
    }
    if !stderr.contains("app: unable to find ELF interpreter absent-ld.so") {
        return Err(format!("Unexpected diagnostic: {:?}", stderr));
    }
    if !stdout.is_empty() {
        return Err(format!("Nothing should have been launched: {:?}", stdout));
    }

    println!("    PASS");
    Ok(())
}

/// Invoking the stub through anything but a symlink is a configuration
/// error.
fn test_invocation_must_be_symlink(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: invocation_must_be_symlink");

    let dir = test_dir(config, "not_a_symlink")?;
    let package = install_package(&dir, "fake-ld.so", None)?;

    // argv[0] names the real binary instead of the front-door link.
    let (_, stderr, exit_code) = run_stub(config, &package.binary, &[], &[])?;
    if exit_code == 0 {
        return Err("Stub should have failed".to_string());
    }
    if !stderr.contains("symbolic link expected") {
        return Err(format!("Unexpected diagnostic: {:?}", stderr));
    }

    println!("    PASS");
    Ok(())
}

/// A front-door link whose target carries no extension is rejected before
/// any ELF introspection happens.
fn test_link_target_needs_extension(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: link_target_needs_extension");

    let dir = test_dir(config, "no_extension")?;
    let package = install_package(&dir, "fake-ld.so", None)?;
    let bare_link = dir.join("front").join("bare");
    symlink(&package.binary, &bare_link).map_err(|e| format!("Failed to create link: {}", e))?;

    let (_, stderr, exit_code) = run_stub(config, &bare_link, &[], &[])?;
    if exit_code == 0 {
        return Err("Stub should have failed".to_string());
    }
    if !stderr.contains("file extension expected") {
        return Err(format!("Unexpected diagnostic: {:?}", stderr));
    }

    println!("    PASS");
    Ok(())
}

/// Directories from LD_LIBRARY_PATH are searched after the cache-derived
/// list and can supply the interpreter.
fn test_library_path_override(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: library_path_override");

    let dir = test_dir(config, "override")?;
    // A relative interpreter name forces the search; no rpath at all.
    let package = install_package(&dir, "fake-ld.so", None)?;
    let override_dir = dir.join("extra");
    let interpreter = install_interpreter(config, &override_dir, "fake-ld.so")?;

    let (stdout, stderr, exit_code) = run_stub(
        config,
        &package.link,
        &[],
        &[("LD_LIBRARY_PATH", &override_dir.to_string_lossy())],
    )?;
    if exit_code != 0 {
        return Err(format!("Stub failed with exit code {}: {}", exit_code, stderr));
    }

    let report = parse_report(&stdout)?;
    let argv = argv_of(&report)?;
    if argv.first().map(String::as_str) != Some(&*interpreter.to_string_lossy()) {
        return Err(format!(
            "Expected the override interpreter {:?}, argv was {:?}",
            interpreter, argv
        ));
    }

    // The winning directory is prepended to the override value it came from.
    let library_path = report["library_path"].as_str().unwrap_or_default();
    let expected = format!("{0}:{0}", override_dir.to_string_lossy());
    if library_path != expected {
        return Err(format!(
            "Unexpected LD_LIBRARY_PATH {:?}, expected {:?}",
            library_path, expected
        ));
    }

    println!("    PASS");
    Ok(())
}

/// The debug toggle traces to stderr without changing the outcome.
fn test_debug_trace(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: debug_trace");

    let dir = test_dir(config, "debug_trace")?;
    let package = install_package(&dir, "fake-ld.so", Some("$ORIGIN/../lib"))?;
    let interpreter = install_interpreter(config, &package.lib_dir, "fake-ld.so")?;

    let (stdout, stderr, exit_code) =
        run_stub(config, &package.link, &[], &[("INTERP_STUB_DEBUG", "1")])?;
    if exit_code != 0 {
        return Err(format!("Stub failed with exit code {}: {}", exit_code, stderr));
    }
    if !stderr.contains("resolved:") {
        return Err(format!("Expected a trace on stderr, got: {:?}", stderr));
    }

    let argv = argv_of(&parse_report(&stdout)?)?;
    if argv.first().map(String::as_str) != Some(&*interpreter.to_string_lossy()) {
        return Err(format!("Tracing changed the resolution: {:?}", argv));
    }

    println!("    PASS");
    Ok(())
}

fn main() -> ExitCode {
    println!("=== interp-stub Test Suite ===");
    println!();

    let config = match TestConfig::from_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            return ExitCode::from(1);
        }
    };

    // Clean and recreate work directory
    if config.work_dir.exists() {
        if let Err(e) = fs::remove_dir_all(&config.work_dir) {
            eprintln!("Warning: Failed to clean work dir: {}", e);
        }
    }
    if let Err(e) = fs::create_dir_all(&config.work_dir) {
        eprintln!("Error: Failed to create work dir: {}", e);
        return ExitCode::from(1);
    }

    println!("Configuration:");
    println!("  Stub:       {}", config.stub_path.display());
    println!("  print-args: {}", config.print_args_path.display());
    println!("  Work dir:   {}", config.work_dir.display());
    println!();

    let tests: Vec<(&str, fn(&TestConfig) -> Result<(), String>)> = vec![
        (
            "resolves_through_origin_hint",
            test_resolves_through_origin_hint,
        ),
        (
            "bundled_interpreter_shadows_hint",
            test_bundled_interpreter_shadows_hint,
        ),
        (
            "embedded_interpreter_direct_launch",
            test_embedded_interpreter_direct_launch,
        ),
        ("argument_fidelity", test_argument_fidelity),
        (
            "missing_interpreter_diagnostic",
            test_missing_interpreter_diagnostic,
        ),
        (
            "invocation_must_be_symlink",
            test_invocation_must_be_symlink,
        ),
        (
            "link_target_needs_extension",
            test_link_target_needs_extension,
        ),
        ("library_path_override", test_library_path_override),
        ("debug_trace", test_debug_trace),
    ];

    let mut passed = 0;
    let mut failed = 0;

    println!("Running {} tests...", tests.len());
    println!();

    for (_name, test_fn) in &tests {
        match test_fn(&config) {
            Ok(()) => {
                passed += 1;
            }
            Err(e) => {
                println!("  FAILED: {}", e);
                failed += 1;
            }
        }
    }

    println!();
    println!("=== Results ===");
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!();

    if failed > 0 {
        ExitCode::from(1)
    } else {
        println!("All tests passed!");
        ExitCode::SUCCESS
    }
}
