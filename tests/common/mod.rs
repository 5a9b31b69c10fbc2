//! Shared helpers for integration tests

#![allow(dead_code)]

use fsak::types::FsakError;
use fsak::ui::Selector;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

pub fn create_test_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dirs");
    }
    fs::write(path, content).expect("Failed to write test file");
}

/// Selector that replays queued answers and records every prompt
#[derive(Default)]
pub struct ScriptedSelector {
    pub many: VecDeque<Vec<usize>>,
    pub confirms: VecDeque<bool>,
    pub prompts: Vec<String>,
}

impl ScriptedSelector {
    pub fn with_many(answers: Vec<Vec<usize>>) -> Self {
        Self {
            many: answers.into(),
            ..Self::default()
        }
    }
}

impl Selector for ScriptedSelector {
    fn select_one(&mut self, prompt: &str, _options: &[String]) -> Result<usize, FsakError> {
        self.prompts.push(prompt.to_string());
        Ok(0)
    }

    fn select_many(&mut self, prompt: &str, _options: &[String]) -> Result<Vec<usize>, FsakError> {
        self.prompts.push(prompt.to_string());
        Ok(self.many.pop_front().unwrap_or_default())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, FsakError> {
        self.prompts.push(prompt.to_string());
        Ok(self.confirms.pop_front().unwrap_or(default))
    }
}
