use std::path::PathBuf;

pub const HELP: &str = "\
Type a question and press enter.
  /image <path>  attach an image to the next message
  /noimage       drop the attached image
  /retry         resend the last question
  /dismiss       clear the error banner
  /new           start a new conversation
  /open <id>     open a stored conversation
  /quit          leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Send(String),
    Image(PathBuf),
    NoImage,
    Retry,
    Dismiss,
    New,
    Open(i64),
    Help,
    Quit,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Self::Send(line.to_string()));
        };

        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "image" if argument.is_empty() => Err("usage: /image <path>".to_string()),
            "image" => Ok(Self::Image(PathBuf::from(argument))),
            "noimage" => Ok(Self::NoImage),
            "retry" => Ok(Self::Retry),
            "dismiss" => Ok(Self::Dismiss),
            "new" => Ok(Self::New),
            "open" => argument
                .parse::<i64>()
                .map(Self::Open)
                .map_err(|_| "usage: /open <conversation id>".to_string()),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command /{}, try /help", other)),
        }
    }
}
