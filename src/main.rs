use std::io::{self, BufRead};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use cryptics::clue::ClueNode;
use cryptics::errors::ParseError;
use cryptics::lexicon::{BigramTable, Lexicon};
use cryptics::shape::Shape;
use cryptics::solver::{Session, SolveStatus, SolverConfig, SolverError};
use cryptics::word_list::WordList;

/// Cryptic crossword clue solver
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    about,
    long_about = None
)]
struct Cli {
    /// The clue tree to solve, e.g. "('clue', ('rev', ('lit', 'stop'), ('rev_', 'up')), ('d', 'containers'))".
    /// Without it, one clue per line is read from stdin.
    expression: Option<String>,

    /// Answer shape: word lengths with an optional letter pattern, e.g. "(7)" or "(3,4) s.e...."
    #[arg(short, long, default_value = "(7)")]
    shape: String,

    /// Synonym dictionary (JSON object of word -> list of synonyms)
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data/synonyms.json"))]
    synonyms: String,

    /// Bigram table (JSON object of word length -> list of letter pairs)
    #[arg(short, long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data/bigrams.json"))]
    bigrams: String,

    /// Build the bigram table from a word list (word;score per line) instead
    #[arg(short, long)]
    word_list: Option<String>,

    /// Minimum score filter for --word-list
    #[arg(short = 'm', long, default_value_t = 50)]
    min_score: i32,

    /// Solve independent operands in parallel
    #[arg(long)]
    parallel: bool,

    /// Keep only answers that are synonyms of the clue's definition
    #[arg(long)]
    check_definition: bool,

    /// Longest anagram fodder to permute
    #[arg(long, default_value_t = 12)]
    max_anagram_len: usize,

    /// Print how each answer was derived
    #[arg(short, long)]
    derivations: bool,
}

/// Entry point of the cryptics CLI.
///
/// Delegates to [`try_main`], printing any error with its code and help
/// text before exiting with code 1.
fn main() -> ExitCode {
    cryptics::log::init_logger(cryptics::log::debug_requested());

    if let Err(e) = try_main() {
        if let Some(solver_err) = e.downcast_ref::<SolverError>() {
            eprintln!("Error: {}", solver_err.display_detailed());
        } else if let Some(parse_err) = e.downcast_ref::<Box<ParseError>>() {
            eprintln!("Error: {}", parse_err.display_detailed());
        } else {
            eprintln!("Error: {e}");
        }
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Load the lexicon, open one session for the shape, then solve the clue given on the
/// command line or every non-blank stdin line. Clues solved from stdin share the
/// session's cache.
fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let t_load = Instant::now();
    let bigrams = match &cli.word_list {
        Some(path) => WordList::load_from_path(path, cli.min_score)?.bigram_table(),
        None => BigramTable::load_from_path(&cli.bigrams)?,
    };
    let lexicon = Lexicon::load_from_path(&cli.synonyms, bigrams)?;
    eprintln!("Loaded {} headwords in {:.3}s", lexicon.word_count(), t_load.elapsed().as_secs_f64());

    let shape: Shape = cli.shape.parse()?;
    let config = SolverConfig {
        max_anagram_len: cli.max_anagram_len,
        parallel: cli.parallel,
        check_definition: cli.check_definition,
        ..SolverConfig::default()
    };
    let session = Session::new(&lexicon, shape, config)?;

    match &cli.expression {
        Some(expression) => solve_and_print(&session, expression, cli.derivations)?,
        None => {
            for line in io::stdin().lock().lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    solve_and_print(&session, &line, cli.derivations)?;
                }
            }
        }
    }

    Ok(())
}

/// Solve one clue and print its answers (uppercase) on stdout, diagnostics on stderr.
fn solve_and_print(session: &Session<'_>, expression: &str, derivations: bool) -> Result<(), Box<dyn std::error::Error>> {
    let root: ClueNode = expression.parse()?;

    let t_solve = Instant::now();
    let solution = session.solve_clue(&root)?;
    let solve_secs = t_solve.elapsed().as_secs_f64();

    for answer in &solution.answers {
        if derivations {
            println!("{}", session.derivation(&root, answer)?);
        } else {
            println!("{}", answer.to_uppercase());
        }
    }

    match solution.status {
        SolveStatus::Complete => {}
        SolveStatus::Unsolvable => eprintln!("No text for some part of the clue"),
        SolveStatus::SearchTooLarge => eprintln!("Part of the search was too large and was skipped"),
        SolveStatus::TimedOut { elapsed } => {
            eprintln!("Timed out after {:.1}s; some answers may be missing", elapsed.as_secs_f64());
        }
    }
    eprintln!("{} answer(s) in {:.3}s ({})", solution.len(), solve_secs, solution.stats);

    Ok(())
}
