//! User facing output: plain console lines, optionally doubled as TeamCity
//! service messages so the build server can show progress and problems.

use crate::unroll_error;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Where the reporter writes to.
pub type Sink = Arc<Mutex<dyn Write + Send>>;

/// Writes progress and errors to stdout, or to any other sink.
#[derive(Clone)]
pub struct Reporter {
    ci_markers: bool,
    sink: Sink,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("ci_markers", &self.ci_markers)
            .finish()
    }
}

impl Reporter {
    /// `ci_markers` enables the `##teamcity[...]` lines.
    pub fn new(ci_markers: bool) -> Self {
        Self::with_sink(ci_markers, Arc::new(Mutex::new(io::stdout())))
    }

    /// Reporter writing to `sink` instead of stdout.
    pub fn with_sink(ci_markers: bool, sink: Sink) -> Self {
        Self { ci_markers, sink }
    }

    /// True if TeamCity service messages are emitted.
    pub fn ci_markers(&self) -> bool {
        self.ci_markers
    }

    /// Report a step of the run.
    pub fn progress(&self, msg: &str) {
        self.line(msg);
        if self.ci_markers {
            self.line(&progress_marker(msg));
        }
    }

    /// Report a problem that ends the run.
    pub fn error(&self, msg: &str) {
        self.line(msg);
        if self.ci_markers {
            self.line(&problem_marker(msg));
        }
    }

    /// Report the error ending the run.
    ///
    /// The console gets the whole cause chain, the build problem only the
    /// headline.
    pub fn fatal(&self, e: &dyn std::error::Error) {
        self.line(&unroll_error(e));
        if self.ci_markers {
            self.line(&problem_marker(&e.to_string()));
        }
    }

    /// Report a transfer percentage.
    ///
    /// With CI markers on this is a regular progress line, otherwise the
    /// current console line is overwritten.
    pub fn percentage(&self, label: &str, percent: u64) {
        if self.ci_markers {
            self.progress(&format!("{}: {}%", label, percent));
        } else {
            self.write(format_args!("\r{}%             ", percent));
        }
    }

    /// Print a liveness tick on the current line.
    pub fn tick(&self) {
        self.write(format_args!("."));
    }

    /// Print a plain line, never doubled as a service message.
    pub fn line(&self, msg: &str) {
        self.write(format_args!("{}\n", msg));
    }

    // Best effort
    fn write(&self, args: std::fmt::Arguments) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.write_fmt(args);
            let _ = sink.flush();
        }
    }
}

/// `##teamcity[progressMessage '<msg>']`
pub fn progress_marker(msg: &str) -> String {
    format!("##teamcity[progressMessage '{}']", escape(msg))
}

/// `##teamcity[buildProblem description='<msg>']`
pub fn problem_marker(msg: &str) -> String {
    format!("##teamcity[buildProblem description='{}']", escape(msg))
}

/// Escape a value of a TeamCity service message.
pub fn escape(value: &str) -> String {
    let mut s = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => s.push_str("||"),
            '\'' => s.push_str("|'"),
            '[' => s.push_str("|["),
            ']' => s.push_str("|]"),
            '\n' => s.push_str("|n"),
            '\r' => s.push_str("|r"),
            c => s.push(c),
        }
    }
    s
}
