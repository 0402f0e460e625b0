use anyhow::bail;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::io::{Write, stdout};
use std::path::{Path, PathBuf};

use vmt::Translator;
use vmt::frontend::diagnostic::Diagnostic;
use vmt::frontend::parser::parse;

#[derive(Ord, PartialOrd, Eq, PartialEq, Debug)]
enum CommandArg {
    Parse,
    Emit,
}

fn main() -> Result<(), anyhow::Error> {
    let args: Vec<String> = std::env::args().collect();
    let command: CommandArg;
    let input: &str;

    match args.len() {
        2 => {
            command = CommandArg::Emit;
            input = &args[1];
        }
        3 => {
            match args[1].as_str() {
                "--parse" => command = CommandArg::Parse,
                _ => {
                    print_usage(&args[0])?;
                    bail!("unknown option `{}`", args[1]);
                }
            }
            input = &args[2];
        }
        _ => {
            print_usage(&args[0])?;
            bail!("invalid number of arguments");
        }
    }

    let (files, output) = collect_input(Path::new(input))?;

    let mut sources: Vec<(String, String)> = Vec::new();
    for file in &files {
        let unit = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = fs::read_to_string(file)?;
        sources.push((unit, text));
    }

    if command == CommandArg::Parse {
        return dump_parsed(&sources);
    }

    let mut translator = Translator::new();
    for (unit, text) in &sources {
        translator.add_source(unit.clone(), text.clone());
    }

    match translator.translate() {
        Ok(translation) => {
            for warning in &translation.warnings {
                eprint!("{}", Diagnostic::warning(warning.message.clone()));
            }
            fs::write(&output, translation.asm)?;
            println!("File created: {}", output.display());
            Ok(())
        }
        Err(errors) => {
            let by_unit: HashMap<&str, &str> = sources
                .iter()
                .map(|(unit, text)| (unit.as_str(), text.as_str()))
                .collect();
            for error in errors.iter() {
                let source = error.unit().and_then(|unit| by_unit.get(unit).copied());
                eprint!("{}", Diagnostic::from_error(error).format(source));
            }
            bail!("translation failed with {} error(s)", errors.len());
        }
    }
}

/// Resolves the input path to the list of `.vm` files to translate and
/// the `.asm` path to write. A directory input translates every `.vm`
/// file in it, sorted by name, into `<dir>/<dirname>.asm`.
fn collect_input(path: &Path) -> Result<(Vec<PathBuf>, PathBuf), anyhow::Error> {
    if path.is_file() {
        if path.extension().and_then(|ext| ext.to_str()) != Some("vm") {
            bail!("a .vm file is required: {}", path.display());
        }
        return Ok((vec![path.to_path_buf()], path.with_extension("asm")));
    }

    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("vm"))
            .collect();
        if files.is_empty() {
            bail!("no .vm file in directory {}", path.display());
        }
        files.sort();

        let dir_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        return Ok((files, path.join(format!("{}.asm", dir_name))));
    }

    bail!("no such file or directory: {}", path.display());
}

fn dump_parsed(sources: &[(String, String)]) -> Result<(), anyhow::Error> {
    let mut failed = 0;
    for (unit, text) in sources {
        match parse(unit, text) {
            Ok(lines) => {
                println!("// {}", unit);
                for line in lines {
                    println!("{:4}  {}", line.line, line.instruction);
                }
            }
            Err(errors) => {
                for error in &errors {
                    eprint!("{}", Diagnostic::from_error(error).format(Some(text)));
                }
                failed += errors.len();
            }
        }
    }
    if failed > 0 {
        bail!("parsing failed with {} error(s)", failed);
    }
    Ok(())
}

fn print_usage(arg0: &str) -> io::Result<()> {
    let mut stdout = stdout().lock();
    let name = arg0.split('/').next_back().unwrap_or(arg0);
    writeln!(stdout, "Usage: {} [--parse] <file.vm | directory>", name)?;
    Ok(())
}
