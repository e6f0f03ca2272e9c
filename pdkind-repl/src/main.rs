#![cfg(not(test))]

#[macro_use]
extern crate failure;

use std::collections::HashMap;
use std::process::exit;

use docopt::Docopt;
use failure::Fallible;
use rustyline::error::ReadlineError;
use serde::Deserialize;

use pdkind_integration::{Context, Options};
use pdkind_ir::Dialect;

const USAGE: &str = "
pd-kind repl

Usage:
  pdkind [options]
  pdkind (-h | --help)

Options:
  --help                   Show this screen.
  --program=PATH           Load an mcmt/chc source file before entering the REPL.
  --goal=TEXT              A command to run against the loaded program (may be given more than once).
  --dialect=DIALECT        Input dialect: mcmt or chc [default: mcmt].
  --solver=NAME            Backend SMT solver name [default: naive].
  --ic3-max-frames=N       Frame budget before giving up.
  --ic3-max-frame-size=N   Per-frame lemma budget before giving up.
  --show-trace             Print the counterexample trace on an invalid verdict.
  --show-invariant         Print the inductive invariant on a valid verdict.
";

/// This struct represents the various command line options available.
#[derive(Debug, Deserialize)]
struct Args {
    flag_program: Option<String>,
    flag_goal: Vec<String>,
    flag_dialect: String,
    flag_solver: String,
    flag_ic3_max_frames: Option<usize>,
    flag_ic3_max_frame_size: Option<usize>,
    flag_show_trace: bool,
    flag_show_invariant: bool,
}

impl Args {
    fn dialect(&self) -> Fallible<Dialect> {
        match self.flag_dialect.as_str() {
            "mcmt" => Ok(Dialect::Mcmt),
            "chc" => Ok(Dialect::Chc),
            other => Err(format_err!("unknown dialect '{}': expected 'mcmt' or 'chc'", other)),
        }
    }

    fn options(&self) -> Options {
        let mut raw = HashMap::new();
        raw.insert("engine".to_string(), "pd-kind".to_string());
        raw.insert("solver".to_string(), self.flag_solver.clone());
        if let Some(n) = self.flag_ic3_max_frames {
            raw.insert("ic3-max-frames".to_string(), n.to_string());
        }
        if let Some(n) = self.flag_ic3_max_frame_size {
            raw.insert("ic3-max-frame-size".to_string(), n.to_string());
        }
        if self.flag_show_trace {
            raw.insert("show-trace".to_string(), "true".to_string());
        }
        if self.flag_show_invariant {
            raw.insert("show-invariant".to_string(), "true".to_string());
        }
        Options::new(raw)
    }
}

fn run() -> Fallible<()> {
    tracing_subscriber::fmt::init();

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());
    let dialect = args.dialect()?;
    let mut ctx = Context::create(args.options())?;

    let mut source = String::new();
    if let Some(path) = &args.flag_program {
        source = std::fs::read_to_string(path)?;
    }
    for goal in &args.flag_goal {
        source.push('\n');
        source.push_str(goal);
    }

    if !source.trim().is_empty() {
        let verdicts = ctx.run_on_source(&source, dialect)?;
        for verdict in &verdicts {
            print_verdict(&ctx, verdict, &args);
        }
    }

    if args.flag_goal.is_empty() {
        readline_loop(&mut rustyline::Editor::<()>::new()?, "pd-kind> ", |rl, line| {
            if let Err(e) = process(line, &mut ctx, dialect, &args) {
                eprintln!("error: {}", e);
            }
            let _ = rl;
        })
    } else {
        Ok(())
    }
}

/// Reads input lines from the user. Lines start with the string given by
/// `prompt`. Each line the user enters is passed to `f` for processing.
///
/// The loop terminates (and the program ends) when EOF is reached or if an
/// error occurs while reading the next line.
fn readline_loop<F>(rl: &mut rustyline::Editor<()>, prompt: &str, mut f: F) -> Fallible<()>
where
    F: FnMut(&mut rustyline::Editor<()>, &str),
{
    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                rl.add_history_entry(&line);
                f(rl, &line);
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Processes one REPL line: `help`, `stats`, or a `(lemma ...)` /
/// `(ilemma ...)` / `(query ...)` command run against the context.
fn process(line: &str, ctx: &mut Context, dialect: Dialect, args: &Args) -> Fallible<()> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    match trimmed {
        "help" | "h" => {
            help();
            Ok(())
        }
        "stats" => {
            match ctx.current_system_id() {
                Some(id) => {
                    let id = id.to_string();
                    if let Some(stats) = ctx.stats(&id) {
                        println!("{stats:#?}");
                    }
                }
                None => println!("no current system; run a query first"),
            }
            Ok(())
        }
        _ => {
            let verdicts = ctx.run_on_source(trimmed, dialect)?;
            for verdict in &verdicts {
                print_verdict(ctx, verdict, args);
            }
            Ok(())
        }
    }
}

fn print_verdict(ctx: &Context, verdict: &pdkind_core::Verdict, args: &Args) {
    use pdkind_core::Verdict;
    match verdict {
        Verdict::Valid { invariant } => {
            println!("valid");
            if args.flag_show_invariant {
                for lemma in invariant {
                    println!("  {}", ctx.term_to_string(*lemma));
                }
            }
        }
        Verdict::Invalid { trace } => {
            println!("invalid");
            if args.flag_show_trace {
                for (i, state) in trace.iter().enumerate() {
                    println!("  step {i}: {state:?}");
                }
            }
        }
        Verdict::Unknown { cause } => println!("unknown ({cause:?})"),
    }
}

fn help() {
    println!("Commands:");
    println!("  help               print this output");
    println!("  stats              print search statistics for the current system");
    println!("  (lemma ...)        install a reachability lemma");
    println!("  (ilemma ...)       install an induction lemma");
    println!("  (query <sys> <p>)  check whether <p> holds of <sys>");
}

fn main() {
    exit(match run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    });
}
