use std::io;

#[path = "../script.rs"]
mod script;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, SessionOptions};

const TRANSCRIPTS: &[(&str, &[&str])] = &[
    (
        "transcripts/full-run.log",
        &[
            "help",
            "knob 0",
            "sample",
            "knob 300",
            "sample",
            "status",
            "start",
        ],
    ),
    (
        "transcripts/stop-abort.log",
        &[
            "knob 1023",
            "sample",
            "press stop +400",
            "start",
            "knob 640",
            "sample",
        ],
    ),
    (
        "transcripts/fixed-table.log",
        &[
            "mode table",
            "knob 1023",
            "sample",
            "press stop +120 hold 80",
            "start",
            "mode proportional",
            "status",
        ],
    ),
];

fn main() -> io::Result<()> {
    for (path, script) in TRANSCRIPTS {
        record(path, script)?;
    }
    Ok(())
}

fn record(path: &str, script: &[&str]) -> io::Result<()> {
    let mut session = Session::new(SessionOptions {
        color: false,
        transcript: Some(path.to_string()),
    })?;
    for line in script {
        let _ = session.handle_command(line)?;
    }
    Ok(())
}
