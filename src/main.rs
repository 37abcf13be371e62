// Froth: a small concatenative, stack-based scripting language core.
//
// Copyright (C) 2019  Brandon Lewis
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public License
// as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this program.  If not, see
// <https://www.gnu.org/licenses/>.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use froth::config::Config;
use froth::{ErrorKind, HostWord, StdoutSink, Token, Vm};

/// An example host word, registered below to exercise the extension
/// point described in §6: a host handler manipulates the VM's stack
/// through its public API, never the VM's internals. `depth` pushes the
/// current stack depth, the kind of host-level introspection word an
/// embedding editor's stack viewer would want.
struct StackDepth;

impl HostWord for StackDepth {
    fn call(&self, vm: &mut Vm, _literal_args: &[Token]) -> Option<ErrorKind> {
        let depth = vm.stack().len() as i64;
        vm.push(depth);
        None
    }
}

/// Host words this binary layers on top of the core builtins.
fn host_words() -> HashMap<String, Rc<dyn HostWord>> {
    let mut words: HashMap<String, Rc<dyn HostWord>> = HashMap::new();
    words.insert("depth".to_string(), Rc::new(StackDepth));
    words
}

#[derive(Parser)]
#[command(name = "froth")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A small concatenative, stack-based scripting language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a source file and run it to completion.
    Run {
        /// Froth source file.
        path: PathBuf,

        /// Optional host configuration file (RON).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Milliseconds to pace between ticks; overrides the config file.
        #[arg(long)]
        step_delay: Option<u64>,

        /// Raise log verbosity to step-by-step tracing.
        #[arg(long)]
        trace: bool,
    },

    /// Tokenize every line of a source file without executing it,
    /// reporting the first unterminated-string failure, if any.
    Check {
        /// Froth source file.
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            path,
            config,
            step_delay,
            trace,
        } => run(path, config.as_deref(), *step_delay, *trace),
        Commands::Check { path } => check(path),
    }
}

fn init_tracing(trace: bool) {
    let default_filter = if trace { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(path: &std::path::Path, config_path: Option<&std::path::Path>, step_delay: Option<u64>, trace: bool) -> ExitCode {
    init_tracing(trace);

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("couldn't read {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let config = match config_path {
        Some(config_path) => match Config::load(config_path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if let Some(collision) = reserved_word_collision(&source, &config.reserved_words) {
        eprintln!(
            "{}: word '{}' is reserved by the host configuration",
            path.display(),
            collision
        );
        return ExitCode::FAILURE;
    }

    let delay_ms = step_delay.or(config.step_delay_ms);

    let mut vm = Vm::new(&source, Box::new(StdoutSink), host_words())
        .with_max_line_tokens(config.max_line_tokens());
    vm.preallocate(config.initial_memory as i64);

    let final_kind = match delay_ms {
        Some(ms) => {
            let delay = Duration::from_millis(ms);
            loop {
                let kind = vm.tick();
                if !kind.is_success() {
                    break kind;
                }
                thread::sleep(delay);
            }
        }
        None => vm.run_until_end(),
    };

    info!(result = %final_kind, pc = vm.pc(), "program finished");

    match final_kind {
        ErrorKind::EndOfProgram => ExitCode::SUCCESS,
        kind => {
            eprintln!("{} at line {}", kind, vm.pc() + 1);
            ExitCode::FAILURE
        }
    }
}

/// Scan `source` for `var NAME` or `macro NAME` definitions that shadow a
/// host-reserved word, returning the first offending name found.
fn reserved_word_collision(source: &str, reserved: &[String]) -> Option<String> {
    if reserved.is_empty() {
        return None;
    }
    for line in source.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens = match froth::token::tokenize(trimmed) {
            Ok(tokens) => tokens,
            Err(_) => continue,
        };
        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            let is_definer = matches!(&token, froth::Token::Word(w) if w == "var" || w == "macro");
            if is_definer {
                if let Some(froth::Token::Word(name)) = iter.next() {
                    if reserved.iter().any(|r| r == &name) {
                        return Some(name);
                    }
                }
            }
        }
    }
    None
}

fn check(path: &std::path::Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("couldn't read {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    for (number, line) in source.split('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Err(kind) = froth::token::tokenize(trimmed) {
            eprintln!("{}:{}: {}", path.display(), number + 1, kind);
            return ExitCode::FAILURE;
        }
    }

    println!("{}: ok", path.display());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reserved_words_means_no_collision() {
        assert_eq!(reserved_word_collision("var x 1", &[]), None);
    }

    #[test]
    fn var_definition_colliding_with_a_reserved_word_is_reported() {
        let reserved = vec!["drawline".to_string()];
        assert_eq!(
            reserved_word_collision("1 var drawline", &reserved),
            Some("drawline".to_string())
        );
    }

    #[test]
    fn macro_definition_colliding_with_a_reserved_word_is_reported() {
        let reserved = vec!["recv".to_string()];
        assert_eq!(
            reserved_word_collision("macro recv 1 ;", &reserved),
            Some("recv".to_string())
        );
    }

    #[test]
    fn unrelated_definitions_do_not_collide() {
        let reserved = vec!["drawline".to_string()];
        assert_eq!(reserved_word_collision("var x 1\nmacro y 2 ;", &reserved), None);
    }

    #[test]
    fn depth_host_word_pushes_the_current_stack_depth() {
        let mut vm = Vm::new(
            "1 2 3 depth",
            Box::new(froth::BufferSink::new()),
            host_words(),
        );
        let kind = vm.run_until_end();
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(vm.stack(), &[1, 2, 3, 3]);
    }
}
