//! Parsing of terminal input lines.

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Anything that is not a command is a question.
    Question(String),
    /// `/ask <n>`: the n-th example question, 1-based.
    Example(usize),
    New,
    Toggle,
    Dismiss,
    Help,
    Quit,
    /// A malformed or unknown command, with the message to show.
    Invalid(String),
}

pub fn parse(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(command) = line.trim_start().strip_prefix('/') else {
        return Input::Question(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (name, arg) {
        ("new", None) => Input::New,
        ("toggle", None) => Input::Toggle,
        ("dismiss", None) => Input::Dismiss,
        ("help", None) => Input::Help,
        ("quit" | "exit", None) => Input::Quit,
        ("ask", Some(n)) => match n.parse::<usize>() {
            Ok(n) if n > 0 && parts.next().is_none() => Input::Example(n),
            _ => Input::Invalid(format!("usage: /ask <n> (got '{n}')")),
        },
        ("ask", None) => Input::Invalid("usage: /ask <n>".into()),
        (name, _) => Input::Invalid(format!("unknown command: /{name} (try /help)")),
    }
}
