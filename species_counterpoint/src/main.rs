// Species counterpoint CLI.
//
// Checks exercise files against the rule catalog and generates cantus
// firmus melodies.
//
// Usage:
//   counterpoint analyze <exercise.json> [--parallel] [--json] [--midi OUT.mid] [--tempo BPM]
//   counterpoint generate [--key KEY] [--length N] [--clef CLEF] [--seed N]
//     [--config FILE] [--midi OUT.mid] [--tempo BPM]
//
// `analyze` exits with status 1 when the exercise has errors. A flag with a
// missing or unparseable value exits with status 2. Logs go to stderr.

use species_counterpoint::analysis::Analyzer;
use species_counterpoint::cantus::{Clef, generate_cantus_firmus};
use species_counterpoint::config::{ExerciseFile, GeneratorConfig};
use species_counterpoint::key::Key;
use species_counterpoint::midi::write_exercise;
use species_counterpoint::rules::RuleCatalog;
use species_counterpoint::species::Species;
use species_prng::SeededRng;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("analyze") => analyze(&args),
        Some("generate") => generate(&args),
        _ => {
            eprintln!("Usage:");
            eprintln!("  counterpoint analyze <exercise.json> [--parallel] [--json] [--midi OUT.mid] [--tempo BPM]");
            eprintln!("  counterpoint generate [--key KEY] [--length N] [--clef CLEF] [--seed N] [--config FILE] [--midi OUT.mid]");
            ExitCode::from(2)
        }
    }
}

fn analyze(args: &[String]) -> ExitCode {
    let Some(path) = args.get(2).filter(|s| !s.starts_with("--")) else {
        eprintln!("analyze: missing exercise file");
        return ExitCode::from(2);
    };
    let (out, tempo) = match midi_flags(args) {
        Ok(flags) => flags,
        Err(e) => return usage_error(e),
    };
    let exercise = match ExerciseFile::load(Path::new(path)) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            return ExitCode::from(2);
        }
    };
    let ctx = match exercise.to_context() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error in {}: {}", path, e);
            return ExitCode::from(2);
        }
    };

    let catalog = RuleCatalog::standard();
    let analyzer = Analyzer::new(&catalog);
    let result = if has_flag(args, "--parallel") {
        analyzer.analyze_parallel(&ctx)
    } else {
        analyzer.analyze(&ctx)
    };

    if has_flag(args, "--json") {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing result: {}", e);
                return ExitCode::from(2);
            }
        }
    } else {
        println!("{} in {} ({})", ctx.species, ctx.key, path);
        for v in &result.violations {
            println!("  {}", v);
        }
        println!(
            "{}: {} error(s), {} warning(s)",
            if result.is_valid { "valid" } else { "invalid" },
            result.error_count,
            result.warning_count
        );
    }

    let written = out
        .as_deref()
        .map(|out| write_exercise(&ctx.cantus_firmus, &ctx.counterpoint, ctx.species, tempo, Path::new(out)));
    if let Some(Err(e)) = written {
        eprintln!("Error writing MIDI: {}", e);
        return ExitCode::from(2);
    }

    if result.is_valid { ExitCode::SUCCESS } else { ExitCode::from(1) }
}

fn generate(args: &[String]) -> ExitCode {
    let config_path = match parse_flag::<String>(args, "--config") {
        Ok(p) => p,
        Err(e) => return usage_error(e),
    };
    let mut config = match config_path {
        Some(path) => match GeneratorConfig::load(Path::new(&path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading {}: {}", path, e);
                return ExitCode::from(2);
            }
        },
        None => GeneratorConfig::default(),
    };
    let seed = match apply_generator_flags(args, &mut config) {
        Ok(seed) => seed.unwrap_or_else(clock_seed),
        Err(e) => return usage_error(e),
    };
    let (out, tempo) = match midi_flags(args) {
        Ok(flags) => flags,
        Err(e) => return usage_error(e),
    };

    let mut rng = SeededRng::new(seed);
    let melody = match generate_cantus_firmus(&config, &mut rng) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    println!("Key: {}  Clef: {}  Length: {}  Seed: {}", config.key, config.clef, config.length, seed);
    let names: Vec<String> = melody.iter().map(|n| n.pitch.to_string()).collect();
    println!("{}", names.join(" "));

    if let Some(out) = out {
        if let Err(e) = write_exercise(&melody, &[], Species::First, tempo, Path::new(&out)) {
            eprintln!("Error writing MIDI: {}", e);
            return ExitCode::from(2);
        }
        println!("Wrote {}", out);
    }
    ExitCode::SUCCESS
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// The value after `flag`, or `None` when the flag is absent. A flag given
/// without a usable value is an error rather than a silent default.
fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>, String> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let value = args
        .get(i + 1)
        .filter(|v| !v.starts_with("--"))
        .ok_or_else(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("invalid value {value:?} for {flag}"))
}

/// Apply `--key`, `--length` and `--clef` on top of `config`; returns the
/// `--seed` if one was given.
fn apply_generator_flags(args: &[String], config: &mut GeneratorConfig) -> Result<Option<u64>, String> {
    if let Some(key) = parse_flag::<Key>(args, "--key")? {
        config.key = key;
    }
    if let Some(length) = parse_flag(args, "--length")? {
        config.length = length;
    }
    if let Some(clef) = parse_flag::<Clef>(args, "--clef")? {
        config.clef = clef;
    }
    parse_flag(args, "--seed")
}

/// `--midi` output path and `--tempo` (72 BPM by default).
fn midi_flags(args: &[String]) -> Result<(Option<String>, u16), String> {
    let out = parse_flag(args, "--midi")?;
    let tempo = parse_flag(args, "--tempo")?.unwrap_or(72);
    Ok((out, tempo))
}

fn usage_error(message: String) -> ExitCode {
    tracing::error!(%message, "bad command line");
    ExitCode::from(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_bad_flag_values_are_errors() {
        let mut config = GeneratorConfig::default();
        for line in [
            "counterpoint generate --key H",
            "counterpoint generate --length many",
            "counterpoint generate --clef soprano",
            "counterpoint generate --seed -3",
            "counterpoint generate --key",
            "counterpoint generate --key --seed 4",
        ] {
            assert!(apply_generator_flags(&args(line), &mut config).is_err(), "{line}");
        }
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(
            midi_flags(&args("counterpoint analyze ex.json --midi out.mid --tempo fast")),
            Err("invalid value \"fast\" for --tempo".to_string())
        );
    }

    #[test]
    fn test_good_flags_apply() {
        let mut config = GeneratorConfig::default();
        let seed = apply_generator_flags(
            &args("counterpoint generate --key Bb --length 9 --clef tenor --seed 11"),
            &mut config,
        );
        assert_eq!(seed, Ok(Some(11)));
        assert_eq!(config.key, "Bb".parse::<Key>().unwrap());
        assert_eq!((config.length, config.clef), (9, Clef::Tenor));
        assert_eq!(midi_flags(&args("counterpoint generate")), Ok((None, 72)));
    }
}
