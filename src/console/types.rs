use std::str::FromStr;

use crate::device::types::ScanEvent;
use crate::error::UnknownCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Enable,
    Scan,
    Stop,
    List,
    Clear,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enable" | "e" => Ok(ConsoleCommand::Enable),
            "scan" | "s" => Ok(ConsoleCommand::Scan),
            "stop" | "x" => Ok(ConsoleCommand::Stop),
            "list" | "l" | "ls" => Ok(ConsoleCommand::List),
            "clear" => Ok(ConsoleCommand::Clear),
            "help" | "h" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
            _ => Err(UnknownCommand { input: s.trim().to_string() }),
        }
    }
}

pub const HELP: &str = "\
Commands:
  enable  ask the operating system to turn bluetooth on
  scan    scan for nearby BLE devices
  stop    stop the running scan
  list    show the devices found so far
  clear   forget the devices found so far
  help    show this text
  quit    stop scanning and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Command(ConsoleCommand),
    UnknownInput(String),
    Scan(ScanEvent),
}

/// Blank lines yield nothing.
pub fn parse_line(line: &str) -> Option<Message> {
    if line.trim().is_empty() {
        return None;
    }

    Some(match line.parse::<ConsoleCommand>() {
        Ok(command) => Message::Command(command),
        Err(UnknownCommand { input }) => Message::UnknownInput(input),
    })
}
