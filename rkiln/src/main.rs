#[macro_use]
extern crate log;

use docopt::Docopt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

const USAGE: &str = "
rkiln: compile kiln programs to x86-64 linux assembly

Usage:
    rkiln [options] <input>
    rkiln (-h | --help)

Options:
    -h --help              Show this screen.
    -o --output=<file>     Where to write the assembly [default: out.asm].
    --assemble             Also run nasm and ld on the output to build an executable.
";

#[derive(Debug, Deserialize)]
struct Args {
    arg_input: String,
    flag_output: String,
    flag_assemble: bool,
}

/// runs an external tool, failing on a non-zero exit
fn run(program: &str, args: &[&str]) -> Result<(), String> {
    info!("running {} {}", program, args.join(" "));
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| format!("could not run {}: {}", program, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{} failed with {}", program, status))
    }
}

/// out.asm -> (out.o, out). an output with no extension would be its own
/// executable, so that one gets out.o and out.out
fn artifact_paths(asm_path: &Path) -> (PathBuf, PathBuf) {
    let executable = match asm_path.extension() {
        Some(_) => asm_path.with_extension(""),
        None => asm_path.with_extension("out"),
    };
    (asm_path.with_extension("o"), executable)
}

fn try_main(args: &Args) -> Result<(), String> {
    let input = Path::new(&args.arg_input);
    if !input.is_file() {
        return Err(format!("the file {} does not exist", input.display()));
    }
    if input.extension().map_or(true, |ext| ext != "kn") {
        return Err(format!("{} is not a kiln file (expected .kn)", input.display()));
    }
    let source = std::fs::read_to_string(input)
        .map_err(|e| format!("could not read {}: {}", input.display(), e))?;
    let assembly = rkiln::compile(&source).map_err(|e| e.to_string())?;
    std::fs::write(&args.flag_output, assembly)
        .map_err(|e| format!("could not write {}: {}", args.flag_output, e))?;
    info!("wrote {}", args.flag_output);
    if args.flag_assemble {
        let (object, executable) = artifact_paths(Path::new(&args.flag_output));
        let object = object.to_string_lossy().to_string();
        let executable = executable.to_string_lossy().to_string();
        run("nasm", &["-felf64", &args.flag_output, "-o", &object])?;
        run("ld", &[&object, "-o", &executable])?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());
    debug!("{:?}", args);
    if let Err(message) = try_main(&args) {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}
