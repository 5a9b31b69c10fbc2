//! Selector capability: the only way business logic asks the user anything

use crate::types::FsakError;
use console::{style, Term};

/// Answers pick-one, pick-many and yes/no questions
///
/// Choices are returned as indices into `options`. Implementations must
/// fail with `FsakError::Selection` when `options` is empty.
pub trait Selector {
    fn select_one(&mut self, prompt: &str, options: &[String]) -> Result<usize, FsakError>;

    /// Any subset, possibly empty, in ascending order without repeats
    fn select_many(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>, FsakError>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, FsakError>;
}

/// Numbered-list prompts on the terminal
pub struct TermSelector {
    term: Term,
}

impl TermSelector {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn print_options(&self, prompt: &str, options: &[String]) -> Result<(), FsakError> {
        self.term.write_line(&format!("{}", style(prompt).bold()))?;
        for (i, option) in options.iter().enumerate() {
            self.term
                .write_line(&format!("  {} {}", style(format!("{:>3})", i + 1)).cyan(), option))?;
        }
        Ok(())
    }

    fn ask(&self, hint: &str) -> Result<String, FsakError> {
        if !self.term.is_term() {
            return Err(FsakError::Selection(format!(
                "no terminal to answer '{}'",
                hint
            )));
        }
        self.term.write_str(&format!("{} ", style(hint).dim()))?;
        Ok(self.term.read_line()?)
    }
}

impl Default for TermSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for TermSelector {
    fn select_one(&mut self, prompt: &str, options: &[String]) -> Result<usize, FsakError> {
        require_options(options)?;
        self.print_options(prompt, options)?;
        loop {
            let line = self.ask(&format!("Pick one [1-{}]:", options.len()))?;
            match parse_choices(&line, options.len()) {
                Ok(picked) if picked.len() == 1 => return Ok(picked[0]),
                Ok(_) => self.term.write_line("Pick exactly one option")?,
                Err(message) => self.term.write_line(&message)?,
            }
        }
    }

    fn select_many(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>, FsakError> {
        require_options(options)?;
        self.print_options(prompt, options)?;
        loop {
            let line = self.ask("Numbers or ranges (e.g. 1 3 5-7), 'all' or 'none':")?;
            match parse_choices(&line, options.len()) {
                Ok(picked) => return Ok(picked),
                Err(message) => self.term.write_line(&message)?,
            }
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, FsakError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let line = self.ask(&format!("{} {}", prompt, hint))?;
            match line.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.term.write_line("Please answer y or n")?,
            }
        }
    }
}

fn require_options(options: &[String]) -> Result<(), FsakError> {
    if options.is_empty() {
        return Err(FsakError::Selection("no options provided".to_string()));
    }
    Ok(())
}

/// Parse `1 3 5-7`, `all`, `none` (or blank) into sorted zero-based indices
pub fn parse_choices(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    match input.to_ascii_lowercase().as_str() {
        "" | "none" => return Ok(Vec::new()),
        "all" | "*" => return Ok((0..count).collect()),
        _ => {}
    }

    let mut picked = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let (low, high) = match token.split_once('-') {
            Some((a, b)) => (parse_number(a, count)?, parse_number(b, count)?),
            None => {
                let n = parse_number(token, count)?;
                (n, n)
            }
        };
        if low > high {
            return Err(format!("Invalid range '{}'", token));
        }
        picked.extend(low - 1..high);
    }

    picked.sort_unstable();
    picked.dedup();
    Ok(picked)
}

fn parse_number(text: &str, count: usize) -> Result<usize, String> {
    let n: usize = text
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", text.trim()))?;
    if n == 0 || n > count {
        return Err(format!("{} is out of range 1-{}", n, count));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_ranges() {
        assert_eq!(parse_choices("1 3 5-7", 8), Ok(vec![0, 2, 4, 5, 6]));
        assert_eq!(parse_choices("2,1,2", 3), Ok(vec![0, 1]));
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_choices("all", 3), Ok(vec![0, 1, 2]));
        assert_eq!(parse_choices("ALL", 2), Ok(vec![0, 1]));
        assert_eq!(parse_choices("none", 3), Ok(vec![]));
        assert_eq!(parse_choices("   ", 3), Ok(vec![]));
    }

    #[test]
    fn test_parse_rejects_out_of_range_and_garbage() {
        assert!(parse_choices("0", 3).is_err());
        assert!(parse_choices("4", 3).is_err());
        assert!(parse_choices("3-1", 3).is_err());
        assert!(parse_choices("two", 3).is_err());
    }

    #[test]
    fn test_term_selector_rejects_empty_options() {
        let mut selector = TermSelector::new();
        assert!(matches!(
            selector.select_many("pick", &[]),
            Err(FsakError::Selection(_))
        ));
        assert!(matches!(
            selector.select_one("pick", &[]),
            Err(FsakError::Selection(_))
        ));
    }
}
