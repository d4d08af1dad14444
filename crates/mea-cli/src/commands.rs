//! Operator input parsing.
//!
//! Lines starting with `/` are commands; anything else is a query.

use mea_chat::Feedback;

pub const HELP: &str = "\
Commands:
  /connect                          open the connection
  /close                            close the connection
  /add-txt <title> | <text>         add a text document
  /add-pdf <path>                   upload a PDF
  /stats                            refresh backend stats
  /progress                         start ingestion progress polling
  /train intent <query> | <intent>  teach an intent
  /train good <query> | <answer>    mark an answer as good
  /train bad <query> | <answer>     mark an answer as bad
  /login <username> <password>
  /register <username> <email> <password>
  /logout
  /help
  /quit
Anything else is sent as a query.";

/// One parsed line of operator input.
#[derive(Debug, PartialEq)]
pub enum Command {
    Query(String),
    Connect,
    Close,
    AddText { title: String, text: String },
    AddPdf(String),
    Stats,
    Progress,
    Train { query: String, feedback: Feedback },
    Login { username: String, password: String },
    Register {
        username: String,
        email: String,
        password: String,
    },
    Logout,
    Help,
    Quit,
}

impl Command {
    /// Parse a line. `Err` carries a usage hint.
    pub fn parse(line: &str) -> Result<Self, &'static str> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Query(line.to_string()));
        };
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();

        match name {
            "connect" => Ok(Self::Connect),
            "close" => Ok(Self::Close),
            "stats" => Ok(Self::Stats),
            "progress" => Ok(Self::Progress),
            "logout" => Ok(Self::Logout),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "add-txt" => {
                // the title may be empty; ingestion fills in a default
                let (title, text) = args.split_once('|').ok_or("usage: /add-txt <title> | <text>")?;
                Ok(Self::AddText {
                    title: title.trim().to_string(),
                    text: text.trim().to_string(),
                })
            }
            "add-pdf" if !args.is_empty() => Ok(Self::AddPdf(args.to_string())),
            "add-pdf" => Err("usage: /add-pdf <path>"),
            "train" => parse_train(args),
            "login" => match words(args)[..] {
                [username, password] => Ok(Self::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                _ => Err("usage: /login <username> <password>"),
            },
            "register" => match words(args)[..] {
                [username, email, password] => Ok(Self::Register {
                    username: username.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => Err("usage: /register <username> <email> <password>"),
            },
            _ => Err("unknown command, try /help"),
        }
    }
}

const TRAIN_USAGE: &str = "usage: /train <intent|good|bad> <query> | <value>";

fn parse_train(args: &str) -> Result<Command, &'static str> {
    let (kind, rest) = args.split_once(char::is_whitespace).ok_or(TRAIN_USAGE)?;
    let (query, value) = rest.split_once('|').ok_or(TRAIN_USAGE)?;
    let value = value.trim().to_string();
    let feedback = match kind {
        "intent" => Feedback::intent(value),
        "good" => Feedback::Positive(value),
        "bad" => Feedback::Negative(value),
        _ => return Err(TRAIN_USAGE),
    };
    Ok(Command::Train {
        query: query.trim().to_string(),
        feedback,
    })
}

fn words(args: &str) -> Vec<&str> {
    args.split_whitespace().collect()
}
