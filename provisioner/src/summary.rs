//! Ordered record of the values a run observed, shown before risky steps.

use crate::output::Printer;
use crate::prompter::Prompter;
use anyhow::Result;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// Projection of a value for the summary table.
///
/// With `verbose == false` implementations must leave out secrets.
pub trait SummaryObject {
    fn as_summary_object(&self, verbose: bool) -> Value;
}

impl SummaryObject for String {
    fn as_summary_object(&self, _verbose: bool) -> Value {
        Value::String(self.clone())
    }
}

impl SummaryObject for &str {
    fn as_summary_object(&self, _verbose: bool) -> Value {
        Value::String((*self).to_string())
    }
}

impl SummaryObject for Value {
    fn as_summary_object(&self, _verbose: bool) -> Value {
        self.clone()
    }
}

impl<T: SummaryObject> SummaryObject for Vec<T> {
    fn as_summary_object(&self, verbose: bool) -> Value {
        Value::Array(self.iter().map(|item| item.as_summary_object(verbose)).collect())
    }
}

pub struct Summary {
    verbose: bool,
    entries: Mutex<Vec<(String, Value)>>,
}

impl Summary {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn append(&self, name: &str, value: &dyn SummaryObject) {
        let projected = value.as_summary_object(self.verbose);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), projected));
    }

    /// Evaluate `thunk`, record its value and hand it back.
    pub fn append_result<T: SummaryObject>(
        &self,
        name: &str,
        thunk: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let value = thunk()?;
        self.append(name, &value);
        Ok(value)
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rows in append order, values rendered as display strings.
    pub fn rows(&self) -> Vec<(String, String)> {
        self.entries()
            .into_iter()
            .map(|(name, value)| (name, render_value(&value)))
            .collect()
    }

    pub fn show_summary_and_prompt_for_enter(
        &self,
        title: &str,
        printer: &dyn Printer,
        prompter: &dyn Prompter,
    ) -> Result<()> {
        printer.header(title);
        for (name, value) in self.rows() {
            if value.contains('\n') {
                printer.print(&format!("{name}:"));
                for line in value.lines() {
                    printer.print(&format!("  {line}"));
                }
            } else {
                printer.print(&format!("{name}: {value}"));
            }
        }
        prompter.prompt_for_enter("Press ENTER to continue")
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".to_string(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
