use std::cell::RefCell;
use std::collections::VecDeque;

use storage_sys::{CommandLine, CommandOutput, CommandRunner, Result, SysError};

/// A command seen by [`ScriptedRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub stdin: Option<String>,
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    responses: VecDeque<CommandOutput>,
}

/// [`CommandRunner`] answering from a script instead of spawning processes.
///
/// Responses are registered per command prefix (matched against the rendered
/// command line, longest prefix wins). Each rule replays its responses in
/// order and keeps repeating the last one. Unscripted commands succeed with
/// empty output. Programs marked with [`ScriptedRunner::without`] fail as not
/// installed.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<RecordedCall>>,
    missing: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` for commands starting with `prefix`
    pub fn on(self, prefix: &str, output: CommandOutput) -> Self {
        self.respond(prefix, output);
        self
    }

    pub fn on_ok(self, prefix: &str, stdout: &str) -> Self {
        self.on(prefix, CommandOutput::ok(stdout))
    }

    pub fn on_exit(self, prefix: &str, code: i32) -> Self {
        self.on(prefix, CommandOutput::failed(code, format!("{prefix}: exit {code}")))
    }

    /// Pretend `program` is not installed
    pub fn without(self, program: &str) -> Self {
        self.missing.borrow_mut().push(program.to_string());
        self
    }

    /// Queue a response on an already shared runner
    pub fn respond(&self, prefix: &str, output: CommandOutput) {
        let mut rules = self.rules.borrow_mut();
        match rules.iter_mut().find(|rule| rule.prefix == prefix) {
            Some(rule) => rule.responses.push_back(output),
            None => rules.push(Rule {
                prefix: prefix.to_string(),
                responses: VecDeque::from([output]),
            }),
        }
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// Rendered command lines, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.command.clone())
            .collect()
    }

    /// Index of the first call starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls
            .borrow()
            .iter()
            .position(|call| call.command.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.command.starts_with(prefix))
            .count()
    }

    fn next_response(&self, rendered: &str) -> CommandOutput {
        let mut rules = self.rules.borrow_mut();
        let rule = rules
            .iter_mut()
            .filter(|rule| rendered.starts_with(&rule.prefix))
            .max_by_key(|rule| rule.prefix.len());

        match rule {
            Some(rule) if rule.responses.len() > 1 => {
                rule.responses.pop_front().unwrap_or_default()
            }
            Some(rule) => rule.responses.front().cloned().unwrap_or_default(),
            None => CommandOutput::ok(""),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn output(&self, command: &CommandLine) -> Result<CommandOutput> {
        let rendered = command.render();
        self.calls.borrow_mut().push(RecordedCall {
            command: rendered.clone(),
            stdin: command.input().map(str::to_string),
        });

        if self.missing.borrow().iter().any(|program| program == command.program()) {
            return Err(SysError::ToolMissing {
                program: command.program().to_string(),
            });
        }
        Ok(self.next_response(&rendered))
    }
}
