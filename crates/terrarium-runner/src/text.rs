//! Text-driven controller: render a prompt, read a reply, parse actions.
//!
//! [`TextController`] is the bridge between the game and anything that
//! speaks the line protocol: a human at a terminal, or a model endpoint
//! behind a [`LineSource`]. Replies go through the same parser as every
//! other controller, so malformed text degrades to a pass.

use std::cell::RefCell;
use std::fmt::Debug;
use std::io::{BufRead, Stdin, Stdout, Write};
use std::rc::Rc;
use std::sync::Arc;

use terrarium_core::protocol::parse_actions;
use terrarium_core::{Controller, DecisionError};
use terrarium_types::{Action, AgentView};
use tracing::debug;

use crate::error::RunnerError;
use crate::personas::PersonaTable;
use crate::prompt::{PromptEngine, RenderedPrompt};

/// Something that answers a rendered prompt with reply text.
pub trait LineSource: Debug {
    /// Present `prompt` for `agent_name` and return the raw reply.
    fn exchange(&mut self, agent_name: &str, prompt: &RenderedPrompt) -> Result<String, RunnerError>;
}

/// One source shared by several controllers, e.g. a single terminal
/// answering for every agent. Stdin cannot be locked twice.
impl<S: LineSource> LineSource for Rc<RefCell<S>> {
    fn exchange(&mut self, agent_name: &str, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        self.borrow_mut().exchange(agent_name, prompt)
    }
}

/// A terminal: writes the prompt, reads reply lines until a blank line or
/// end of input.
#[derive(Debug)]
pub struct ConsoleSource<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleSource<R, W> {
    /// Wrap a reader and writer.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsoleSource<std::io::StdinLock<'static>, Stdout> {
    /// Standard input and output.
    pub fn stdio() -> Self {
        let stdin: Stdin = std::io::stdin();
        Self::new(stdin.lock(), std::io::stdout())
    }
}

impl<R: BufRead + Debug, W: Write + Debug> LineSource for ConsoleSource<R, W> {
    fn exchange(&mut self, agent_name: &str, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        writeln!(self.output, "=== {agent_name} ===")?;
        writeln!(self.output, "{}", prompt.system)?;
        writeln!(self.output)?;
        writeln!(self.output, "{}", prompt.user)?;
        write!(self.output, "> ")?;
        self.output.flush()?;

        let mut reply = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 || line.trim().is_empty() {
                break;
            }
            reply.push_str(&line);
        }
        Ok(reply)
    }
}

/// A controller whose actions come from text read off a [`LineSource`].
#[derive(Debug)]
pub struct TextController {
    identity: String,
    personas: PersonaTable,
    prompts: Arc<PromptEngine>,
    shout_words: usize,
    source: Box<dyn LineSource>,
}

impl TextController {
    /// Create a controller speaking as `identity`.
    ///
    /// `shout_words` is the configured free shout cap, shown in the
    /// action grammar when non-zero.
    pub fn new(
        identity: &str,
        personas: PersonaTable,
        prompts: Arc<PromptEngine>,
        shout_words: usize,
        source: Box<dyn LineSource>,
    ) -> Result<Self, RunnerError> {
        personas.get(identity)?;
        Ok(Self {
            identity: identity.to_owned(),
            personas,
            prompts,
            shout_words,
            source,
        })
    }
}

impl Controller for TextController {
    fn act(&mut self, view: &AgentView) -> Result<Vec<Action>, DecisionError> {
        let persona = self.personas.get(&self.identity)?;
        let prompt = self.prompts.render(view, persona, self.shout_words)?;
        let reply = self.source.exchange(&view.name, &prompt)?;
        debug!(
            round = view.round,
            agent_id = %view.agent_id,
            bytes = reply.len(),
            "Text reply received"
        );
        Ok(parse_actions(&reply))
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn assume_identity(&mut self, identity: &str) -> Result<(), DecisionError> {
        self.personas.get(identity)?;
        identity.clone_into(&mut self.identity);
        Ok(())
    }
}
