//! Plain-text rendering of session updates.

use std::collections::HashMap;
use std::io::{self, Write};

use lti_chat::{ChatUpdate, ConnectionState, Message, Role};
use lti_common::MessageId;

/// Report waiting time every this many seconds.
const ELAPSED_EVERY_SECS: u64 = 5;

const HELP: &str = "\
Type a question and press Enter.
  /ask <n>   ask example question n
  /toggle    show or hide the reasoning of the last answer
  /dismiss   hide the question-limit notice
  /new       start a new chat
  /quit      exit";

/// Presentation side of the terminal client.
pub trait Renderer {
    /// Show a fresh session log.
    fn session(&mut self, messages: &[Message]) -> io::Result<()>;

    fn update(&mut self, update: &ChatUpdate) -> io::Result<()>;

    /// Local feedback that did not come from the session.
    fn note(&mut self, text: &str) -> io::Result<()>;

    fn help(&mut self) -> io::Result<()> {
        self.note(HELP)
    }
}

pub struct PlainRenderer<W: Write> {
    out: W,
    bot_name: String,
    examples: Vec<String>,
    /// Latest reasoning text per exchange, for `/toggle`.
    reasoning: HashMap<MessageId, String>,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(out: W, bot_name: impl Into<String>, examples: Vec<String>) -> Self {
        Self {
            out,
            bot_name: bot_name.into(),
            examples,
            reasoning: HashMap::new(),
        }
    }

    fn message(&mut self, message: &Message) -> io::Result<()> {
        match message.role() {
            Role::User => writeln!(self.out, "you> {}", message.content()),
            Role::Assistant => writeln!(self.out, "{}> {}", self.bot_name, message.content()),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for PlainRenderer<W> {
    fn session(&mut self, messages: &[Message]) -> io::Result<()> {
        self.reasoning.clear();
        for message in messages {
            self.message(message)?;
        }
        if !self.examples.is_empty() {
            writeln!(self.out)?;
            for (n, question) in self.examples.iter().enumerate() {
                writeln!(self.out, "  [{}] {question}", n + 1)?;
            }
            writeln!(self.out, "Use /ask <n> to send one, /help for commands.")?;
        }
        self.out.flush()
    }

    fn update(&mut self, update: &ChatUpdate) -> io::Result<()> {
        match update {
            ChatUpdate::ConnectionChanged(ConnectionState::Open) => {
                writeln!(self.out, "* connected")?;
            }
            ChatUpdate::ConnectionChanged(ConnectionState::Closed) => {
                writeln!(self.out, "* connection lost")?;
            }
            ChatUpdate::ConnectionChanged(_) => {}
            ChatUpdate::Notice(notice) => writeln!(self.out, "! {}", notice.text())?,
            ChatUpdate::NoticeCleared(_) => {}
            ChatUpdate::MessageAppended(message) => self.message(message)?,
            ChatUpdate::ReasoningUpdated { id, reasoning } => {
                if let Some(line) = reasoning.lines().last() {
                    writeln!(self.out, "  ~ {line}")?;
                }
                self.reasoning.insert(id.clone(), reasoning.clone());
            }
            ChatUpdate::ReasoningToggled { id, expanded: true } => {
                writeln!(self.out, "  reasoning:")?;
                for line in self.reasoning.get(id).map(String::as_str).unwrap_or("").lines() {
                    writeln!(self.out, "  | {line}")?;
                }
            }
            ChatUpdate::ReasoningToggled { expanded: false, .. } => {
                writeln!(self.out, "  (reasoning hidden)")?;
            }
            ChatUpdate::Elapsed { seconds, .. } => {
                if *seconds > 0 && seconds % ELAPSED_EVERY_SECS == 0 {
                    writeln!(self.out, "  ... {seconds}s")?;
                }
            }
            ChatUpdate::ExchangeClosed { .. } | ChatUpdate::ConversationStarted { .. } => {}
            ChatUpdate::QuotaChanged {
                used,
                remaining,
                max,
            } => {
                if *used > 0 {
                    writeln!(self.out, "  [{remaining}/{max} questions left]")?;
                }
            }
            ChatUpdate::SessionReset { messages } => {
                writeln!(self.out, "--- new chat ---")?;
                self.session(messages)?;
            }
        }
        self.out.flush()
    }

    fn note(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }
}
