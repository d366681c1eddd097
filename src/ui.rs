use std::io::{self, BufRead, Write};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{AppError, AppResult};

/// Interactive questions asked during a run.
pub trait Prompter {
    /// Free-text answer, trimmed. Empty when the user just presses enter.
    fn input(&self, prompt: &str) -> AppResult<String>;

    /// Yes/no question; an empty answer picks `default`.
    fn confirm(&self, prompt: &str, default: bool) -> AppResult<bool>;

    /// Pick one of `items`; `None` means the user backed out.
    fn select(&self, prompt: &str, items: &[String]) -> AppResult<Option<usize>>;
}

/// Prompter reading answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_answer(&self, prompt: &str) -> AppResult<String> {
        print!("{prompt}");
        io::stdout()
            .flush()
            .map_err(|e| AppError::UserInput(e.to_string()))?;

        let mut buf = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut buf)
            .map_err(|e| AppError::UserInput(e.to_string()))?;
        if read == 0 {
            return Err(AppError::UserInput("stdin closed".into()));
        }
        Ok(buf.trim().to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str) -> AppResult<String> {
        self.read_answer(prompt)
    }

    fn confirm(&self, prompt: &str, default: bool) -> AppResult<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.read_answer(&format!("{prompt} {hint} "))?;
            match parse_yes_no(&answer, default) {
                Some(choice) => return Ok(choice),
                None => println!("Please answer y or n."),
            }
        }
    }

    fn select(&self, prompt: &str, items: &[String]) -> AppResult<Option<usize>> {
        println!("{}", prompt.bold());
        for (idx, item) in items.iter().enumerate() {
            println!("  {}) {item}", idx + 1);
        }
        loop {
            let answer = self.read_answer(&format!("Enter choice [1-{}] (q to cancel): ", items.len()))?;
            match parse_choice(&answer, items.len()) {
                Choice::Picked(idx) => return Ok(Some(idx)),
                Choice::Cancel => return Ok(None),
                Choice::Invalid => {
                    println!("Invalid choice. Please enter a number between 1 and {}.", items.len())
                }
            }
        }
    }
}

fn parse_yes_no(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum Choice {
    Picked(usize),
    Cancel,
    Invalid,
}

fn parse_choice(answer: &str, len: usize) -> Choice {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("q") {
        return Choice::Cancel;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Choice::Picked(n - 1),
        _ => Choice::Invalid,
    }
}

/// `current/total`, percentage and a 20-cell bar while the model works.
pub fn generation_progress(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template("{msg} {pos}/{len} {percent:>3}% [{bar:20}]")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb.set_message("generating");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_answers() {
        assert_eq!(parse_yes_no("", true), Some(true));
        assert_eq!(parse_yes_no("", false), Some(false));
        assert_eq!(parse_yes_no("YES", false), Some(true));
        assert_eq!(parse_yes_no(" n ", true), Some(false));
        assert_eq!(parse_yes_no("maybe", true), None);
    }

    #[test]
    fn choices_are_one_based() {
        assert_eq!(parse_choice("1", 3), Choice::Picked(0));
        assert_eq!(parse_choice("3", 3), Choice::Picked(2));
        assert_eq!(parse_choice("4", 3), Choice::Invalid);
        assert_eq!(parse_choice("0", 3), Choice::Invalid);
        assert_eq!(parse_choice("Q", 3), Choice::Cancel);
    }

    #[test]
    fn progress_bar_has_requested_length() {
        let pb = generation_progress(2);
        assert_eq!(pb.length(), Some(2));
        assert_eq!(pb.position(), 0);
    }
}
