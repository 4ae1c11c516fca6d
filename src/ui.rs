use anstyle::{AnsiColor, Style};
use is_terminal::IsTerminal;
use std::fmt::Display;
use std::io::{self, BufRead, Write};

const STATUS_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Pending,
    Success,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn supports_color(stream: Stream) -> bool {
    let tty = match stream {
        Stream::Stdout => io::stdout().is_terminal(),
        Stream::Stderr => io::stderr().is_terminal(),
    };
    tty && std::env::var_os("NO_COLOR").is_none()
}

fn style_for(kind: StatusKind) -> Style {
    let style = Style::new().bold();
    match kind {
        StatusKind::Pending => style.fg_color(Some(AnsiColor::Cyan.into())),
        StatusKind::Success => style.fg_color(Some(AnsiColor::Green.into())),
        StatusKind::Info => style.fg_color(Some(AnsiColor::Blue.into())),
        StatusKind::Warn => style.fg_color(Some(AnsiColor::Yellow.into())),
        StatusKind::Error => style.fg_color(Some(AnsiColor::Red.into())),
    }
}

fn write_status(kind: StatusKind, label: &str, message: &str) {
    let stream = match kind {
        StatusKind::Warn | StatusKind::Error => Stream::Stderr,
        _ => Stream::Stdout,
    };

    let use_color = supports_color(stream);
    let mut handle: Box<dyn Write> = match stream {
        Stream::Stdout => Box::new(io::stdout().lock()),
        Stream::Stderr => Box::new(io::stderr().lock()),
    };

    let padded_label = if label.is_empty() {
        " ".repeat(STATUS_WIDTH)
    } else {
        format!("{:>width$}", label, width = STATUS_WIDTH)
    };

    let (prefix, suffix) = if use_color {
        let style = style_for(kind);
        (style.render().to_string(), style.render_reset().to_string())
    } else {
        (String::new(), String::new())
    };

    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            let _ = writeln!(handle, "{prefix}{padded_label}{suffix} {line}");
        } else {
            let _ = writeln!(handle, "{:>width$} {line}", "", width = STATUS_WIDTH);
        }
    }
    let _ = handle.flush();
}

pub fn status(label: &str, message: impl Display) {
    write_status(StatusKind::Pending, label, &message.to_string());
}

pub fn info(message: impl Display) {
    write_status(StatusKind::Info, "Info", &message.to_string());
}

/// Follow-up advice, printed under an error.
pub fn hint(message: impl Display) {
    write_status(StatusKind::Info, "Hint", &message.to_string());
}

pub fn warn(message: impl Display) {
    write_status(StatusKind::Warn, "Warning", &message.to_string());
}

pub fn error(message: impl Display) {
    write_status(StatusKind::Error, "Error", &message.to_string());
}

pub fn success(label: &str, message: impl Display) {
    write_status(StatusKind::Success, label, &message.to_string());
}

/// Plain line with the label column left blank, for tables and details.
pub fn detail(message: impl Display) {
    write_status(StatusKind::Pending, "", &message.to_string());
}

/// Ask on stdout and read one trimmed, lowercased line from stdin.
/// `None` when stdin is closed.
pub fn prompt(question: &str) -> Option<String> {
    let mut stdout = io::stdout().lock();
    let _ = write!(stdout, "{question} ");
    let _ = stdout.flush();
    drop(stdout);

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(answer.trim().to_lowercase()),
    }
}

/// True only when the answer is one of `accepted`.
pub fn confirm(question: &str, accepted: &[&str]) -> bool {
    prompt(question).is_some_and(|answer| accepted.contains(&answer.as_str()))
}

pub struct Progress {
    message: String,
    complete: bool,
}

impl Progress {
    pub fn new(label: impl Into<String>, message: impl Into<String>) -> Self {
        let label = label.into();
        let message = message.into();
        write_status(StatusKind::Pending, &label, &message);

        Self {
            message,
            complete: false,
        }
    }

    pub fn success(mut self, label: &str, detail: Option<String>) {
        self.complete = true;
        let mut combined = self.message.clone();
        if let Some(detail) = detail.filter(|detail| !detail.is_empty()) {
            combined.push(' ');
            combined.push_str(&detail);
        }
        write_status(StatusKind::Success, label, &combined);
    }

    pub fn warn(mut self, label: &str, detail: impl Display) {
        self.complete = true;
        let combined = format!("{} ({})", self.message, detail);
        write_status(StatusKind::Warn, label, &combined);
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.complete {
            let combined = format!("{} (aborted)", self.message);
            write_status(StatusKind::Warn, "Cancelled", &combined);
            self.complete = true;
        }
    }
}
