// src/exec/command.rs

//! The command being wrapped, and the span attributes derived from it.

use std::collections::BTreeMap;

use crate::errors::{OtelExecError, Result};

pub const ATTR_COMMAND: &str = "command";
pub const ATTR_ARGUMENTS: &str = "arguments";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    program: String,
    args: Vec<String>,
}

impl CommandDescriptor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full argv: the first element is the program.
    pub fn from_argv(argv: Vec<String>) -> Result<Self> {
        let mut iter = argv.into_iter();
        let program = iter
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| OtelExecError::Config("no command given to execute".to_string()))?;
        Ok(Self::new(program, iter.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The arguments as one CSV record, or `""` when there are none.
    pub fn arguments_attribute(&self) -> Result<String> {
        if self.args.is_empty() {
            return Ok(String::new());
        }
        csv_join(&self.args)
    }

    /// `command` and `arguments` attributes layered over `base`.
    pub fn span_attributes(
        &self,
        base: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let mut attributes = base.clone();
        attributes.insert(ATTR_COMMAND.to_string(), self.program.clone());
        attributes.insert(ATTR_ARGUMENTS.to_string(), self.arguments_attribute()?);
        Ok(attributes)
    }
}

/// Encode `fields` as a single CSV record without the trailing newline.
///
/// Quoting keeps embedded spaces, commas and quotes recoverable.
pub fn csv_join(fields: &[String]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields).map_err(csv_err)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| csv_err(csv::Error::from(e.into_error())))?;
    let mut joined = String::from_utf8(bytes).map_err(|e| OtelExecError::Other(e.into()))?;
    if joined.ends_with('\n') {
        joined.pop();
    }
    Ok(joined)
}

fn csv_err(err: csv::Error) -> OtelExecError {
    OtelExecError::Other(anyhow::anyhow!("encoding arguments as CSV: {err}"))
}
