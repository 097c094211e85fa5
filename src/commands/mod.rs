use log::debug;

use crate::error::{Error, Result};
use crate::models::ElectionId;

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Login { username: String, password: String },
    Logout,
    WhoAmI,
    Elections,
    Vote(ElectionId),
    Results(ElectionId),
    Publish(ElectionId),
    Stats(ElectionId),
    Activate(ElectionId),
    Deactivate(ElectionId),
    /// 1-based index into the candidates listed on the current step.
    Choose(usize),
    Next,
    Back,
    Skip,
    /// 1-based position number from the review screen.
    Change(usize),
    Submit,
    Cancel,
    Quit,
}

pub const HELP: &str = "\
Commands:
  login <username> <password>   sign in
  logout                        sign out
  whoami                        show the signed-in user
  elections                     list active and past elections
  vote <election id>            enter the voting booth
  results <election id>         show results
  publish <election id>         publish results (administrators)
  stats <election id>           turnout and vote counts (administrators)
  activate <election id>        open voting (administrators)
  deactivate <election id>      suspend voting (administrators)
In the booth:
  choose <n>   pick candidate n for this position
  next | back  move between positions
  skip         abstain on this position
  change <n>   jump back to position n from the review screen
  submit       cast the ballot from the review screen
  cancel       leave the booth without voting
  quit         exit";

pub fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err(Error::InvalidCommand("empty input, try `help`".to_string()));
    };
    let args: Vec<&str> = parts.collect();

    let command = match (word.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("help" | "?", []) => Command::Help,
        ("login", [username, password]) => Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        },
        ("logout", []) => Command::Logout,
        ("whoami", []) => Command::WhoAmI,
        ("elections" | "list", []) => Command::Elections,
        ("vote", [id]) => Command::Vote(parse_id(id)?),
        ("results", [id]) => Command::Results(parse_id(id)?),
        ("publish", [id]) => Command::Publish(parse_id(id)?),
        ("stats", [id]) => Command::Stats(parse_id(id)?),
        ("activate", [id]) => Command::Activate(parse_id(id)?),
        ("deactivate" | "stop", [id]) => Command::Deactivate(parse_id(id)?),
        ("choose", [n]) => Command::Choose(parse_index(n)?),
        ("next", []) => Command::Next,
        ("back" | "prev", []) => Command::Back,
        ("skip" | "abstain", []) => Command::Skip,
        ("change", [n]) => Command::Change(parse_index(n)?),
        ("submit", []) => Command::Submit,
        ("cancel", []) => Command::Cancel,
        ("quit" | "exit", []) => Command::Quit,
        (other, _) => {
            debug!("Unrecognised command word: {}", other);
            return Err(Error::InvalidCommand(format!(
                "`{}` not understood, try `help`",
                line.trim()
            )));
        }
    };
    Ok(command)
}

fn parse_id(raw: &str) -> Result<ElectionId> {
    raw.parse::<ElectionId>()
        .map_err(|_| Error::InvalidCommand(format!("'{raw}' is not an election id")))
}

fn parse_index(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::InvalidCommand(format!("'{raw}' is not a number from the list"))),
    }
}
