//! Line grammar for the emulator console.
//!
//! ```text
//! knob <0-1023>
//! sample [count]
//! press <start|stop> [+offset] [hold <units>]
//! start
//! mode <proportional|table>
//! status
//! help [topic]
//! ```
//!
//! Keywords are case-insensitive. `exit` and `quit` are handled by the REPL
//! loop before a line reaches this parser.

use std::fmt;

use waterer_core::countdown::BarGraphMode;
use winnow::ascii::{Caseless, dec_uint, space1};
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::take_till;

/// Hold time given to a `press` without an explicit `hold`, in delay units.
/// Shorter than the default settle delay so the press reads as a tap.
pub const DEFAULT_HOLD_UNITS: u64 = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Button {
    Start,
    Stop,
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::Start => f.write_str("start"),
            Button::Stop => f.write_str("stop"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Knob(u16),
    Sample(u32),
    Press {
        button: Button,
        offset: u64,
        hold: u64,
    },
    Start,
    Mode(BarGraphMode),
    Status,
    Help(Option<String>),
}

/// A line the grammar rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxError {
    pub offset: usize,
    pub line: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at column {}: `{}`", self.offset + 1, self.line)
    }
}

pub fn parse(line: &str) -> Result<Command, SyntaxError> {
    let line = line.trim();
    command.parse(line).map_err(|err| SyntaxError {
        offset: err.offset(),
        line: line.to_string(),
    })
}

fn command(input: &mut &str) -> ModalResult<Command> {
    alt((knob, sample, press, start, mode, status, help)).parse_next(input)
}

fn knob(input: &mut &str) -> ModalResult<Command> {
    preceded((Caseless("knob"), space1), dec_uint)
        .map(Command::Knob)
        .parse_next(input)
}

fn sample(input: &mut &str) -> ModalResult<Command> {
    preceded(Caseless("sample"), opt(preceded(space1, dec_uint)))
        .map(|count: Option<u32>| Command::Sample(count.unwrap_or(1)))
        .parse_next(input)
}

fn press(input: &mut &str) -> ModalResult<Command> {
    let (_, _, button, offset, hold) = (
        Caseless("press"),
        space1,
        button,
        opt(preceded((space1, '+'), dec_uint)),
        opt(preceded((space1, Caseless("hold"), space1), dec_uint)),
    )
        .parse_next(input)?;

    Ok(Command::Press {
        button,
        offset: offset.unwrap_or(0),
        hold: hold.unwrap_or(DEFAULT_HOLD_UNITS),
    })
}

fn button(input: &mut &str) -> ModalResult<Button> {
    alt((
        Caseless("start").value(Button::Start),
        Caseless("stop").value(Button::Stop),
    ))
    .parse_next(input)
}

fn start(input: &mut &str) -> ModalResult<Command> {
    Caseless("start").value(Command::Start).parse_next(input)
}

fn mode(input: &mut &str) -> ModalResult<Command> {
    preceded(
        (Caseless("mode"), space1),
        alt((
            Caseless("proportional").value(BarGraphMode::Proportional),
            Caseless("fixed-table").value(BarGraphMode::FixedTable),
            Caseless("table").value(BarGraphMode::FixedTable),
        )),
    )
    .map(Command::Mode)
    .parse_next(input)
}

fn status(input: &mut &str) -> ModalResult<Command> {
    Caseless("status").value(Command::Status).parse_next(input)
}

fn help(input: &mut &str) -> ModalResult<Command> {
    preceded(
        Caseless("help"),
        opt(preceded(space1, take_till(1.., char::is_whitespace))),
    )
    .map(|topic: Option<&str>| Command::Help(topic.map(str::to_string)))
    .parse_next(input)
}
