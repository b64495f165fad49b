//! Leveled diagnostics with process-wide counters and a pluggable sink.
//!
//! Every stage of the compiler reports problems through [`message`] (or
//! the [`error`]/[`warning`]/[`fatal`] shorthands). Messages carry a
//! severity level, an error code, a position and formatted text; they are
//! routed to a replaceable callback so embedders can capture them. The
//! default callback prints errors and fatals to stderr and everything
//! else to stdout using the canonical format:
//!
//! ```text
//! <level>:<code>: in <file>(<line>:<col>): <message>
//! ```
//!
//! Warning and error counters are process wide, matching the fact that a
//! compile run returns its error count from the top-level entry point.

use std::fmt;
use std::sync::Mutex;

use crate::position::Position;

/// Severity of a message. Also used as the global reporting floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Off,
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl MessageLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every error code the front end can emit.
///
/// The codes tag diagnostics so tests and tools can match on them
/// without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrCode {
    None = 0,
    Abstract,
    BadNumericType,
    BadPragma,
    CannotCompile,
    CannotMatch,
    CannotOverload,
    CannotOverwriteConst,
    CaseLabel,
    ColonExpected,
    CommaExpected,
    CurvlyBracketsExpected,
    DefaultLabel,
    DivideByZero,
    Duplicates,
    Dynamic,
    ExpressionExpected,
    Final,
    ImproperStatement,
    InaccessibleStatement,
    Incompatible,
    IncompatiblePragmaArgument,
    Installation,
    InstanceExpected,
    InternalError,
    Native,
    InvalidAttributes,
    InvalidCatch,
    InvalidClass,
    InvalidConditional,
    InvalidDefinition,
    InvalidDo,
    InvalidEnum,
    InvalidExpression,
    InvalidField,
    InvalidFieldName,
    InvalidFunction,
    InvalidGoto,
    InvalidImport,
    InvalidInputStream,
    InvalidKeyword,
    InvalidLabel,
    InvalidNamespace,
    InvalidNode,
    InvalidNumber,
    InvalidOperator,
    InvalidPackageName,
    InvalidParameters,
    InvalidRest,
    InvalidReturnType,
    InvalidScope,
    InvalidTry,
    InvalidType,
    InvalidUnicodeEscapeSequence,
    InvalidVariable,
    IoError,
    LabelNotFound,
    LoopingReference,
    MismatchFuncVar,
    MissingVariableName,
    NeedConst,
    NotAllowed,
    NotAllowedInStrictMode,
    NotFound,
    NotSupported,
    ObjectMemberDefinedTwice,
    ParenthesisExpected,
    PragmaFailed,
    SemicolonExpected,
    SquareBracketsExpected,
    StringExpected,
    Static,
    TypeNotLinked,
    UnknownEscapeSequence,
    UnknownOperator,
    UnknownPragma,
    UnsupportedCallOperator,
    UnterminatedString,
    UnexpectedDatabase,
    UnexpectedEof,
    UnexpectedPunctuation,
    UnexpectedRc,
    UnexpectedToken,
}

impl ErrCode {
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// A fatal, non-recoverable failure (installation, IO, internal).
///
/// Public entry points return this instead of unwinding so embedders can
/// decide how to terminate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    pub code: ErrCode,
    pub text: String,
}

impl FatalError {
    pub fn new(code: ErrCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal:{}: {}", self.code.code(), self.text)
    }
}

impl std::error::Error for FatalError {}

/// Where emitted messages end up. Replace it with
/// [`set_message_callback`] to capture diagnostics.
pub trait MessageCallback: Send {
    fn output(&mut self, level: MessageLevel, code: ErrCode, pos: &Position, text: &str);
}

struct DefaultCallback;

impl MessageCallback for DefaultCallback {
    fn output(&mut self, level: MessageLevel, code: ErrCode, pos: &Position, text: &str) {
        let line = format_message(level, code, pos, text);
        if level >= MessageLevel::Error {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

struct MessageState {
    callback: Box<dyn MessageCallback>,
    level: MessageLevel,
    warning_count: usize,
    error_count: usize,
}

fn state() -> &'static Mutex<MessageState> {
    static STATE: std::sync::OnceLock<Mutex<MessageState>> = std::sync::OnceLock::new();
    STATE.get_or_init(|| {
        Mutex::new(MessageState {
            callback: Box::new(DefaultCallback),
            level: MessageLevel::Info,
            warning_count: 0,
            error_count: 0,
        })
    })
}

/// Format a diagnostic in the canonical text form.
pub fn format_message(level: MessageLevel, code: ErrCode, pos: &Position, text: &str) -> String {
    if pos.filename().is_empty() {
        format!("{}:{}: {}", level, code.code(), text)
    } else {
        format!(
            "{}:{}: in {}({}:{}): {}",
            level,
            code.code(),
            pos.filename(),
            pos.line(),
            pos.column(),
            text
        )
    }
}

/// Emit a message. Counts warnings and errors, honors the level floor,
/// and forwards to the current callback.
pub fn message(level: MessageLevel, code: ErrCode, pos: &Position, text: impl AsRef<str>) {
    let mut st = state().lock().expect("message state poisoned");
    match level {
        MessageLevel::Warning => st.warning_count += 1,
        MessageLevel::Error | MessageLevel::Fatal => st.error_count += 1,
        _ => {}
    }
    if level < st.level || st.level == MessageLevel::Off {
        return;
    }
    st.callback.output(level, code, pos, text.as_ref());
}

/// Emit an error at the given position.
pub fn error(code: ErrCode, pos: &Position, text: impl AsRef<str>) {
    message(MessageLevel::Error, code, pos, text);
}

/// Emit a warning at the given position.
pub fn warning(code: ErrCode, pos: &Position, text: impl AsRef<str>) {
    message(MessageLevel::Warning, code, pos, text);
}

/// Emit a fatal message and build the matching [`FatalError`].
pub fn fatal(code: ErrCode, pos: &Position, text: impl Into<String>) -> FatalError {
    let text = text.into();
    message(MessageLevel::Fatal, code, pos, &text);
    FatalError::new(code, text)
}

/// Replace the message sink. Returns nothing; the previous callback is
/// dropped.
pub fn set_message_callback(callback: Box<dyn MessageCallback>) {
    state().lock().expect("message state poisoned").callback = callback;
}

/// Set the minimum level a message must have to reach the callback.
/// Counters are maintained regardless of the floor.
pub fn set_message_level(level: MessageLevel) {
    state().lock().expect("message state poisoned").level = level;
}

pub fn warning_count() -> usize {
    state().lock().expect("message state poisoned").warning_count
}

pub fn error_count() -> usize {
    state().lock().expect("message state poisoned").error_count
}

/// Reset both counters. Called by tools between compile runs.
pub fn reset_counters() {
    let mut st = state().lock().expect("message state poisoned");
    st.warning_count = 0;
    st.error_count = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Sender};

    // tests below share the process-wide message state
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    struct Capture(Sender<String>);

    impl MessageCallback for Capture {
        fn output(&mut self, level: MessageLevel, code: ErrCode, pos: &Position, text: &str) {
            let _ = self.0.send(format_message(level, code, pos, text));
        }
    }

    #[test]
    fn format_without_position() {
        let pos = Position::new();
        let line = format_message(MessageLevel::Error, ErrCode::NotFound, &pos, "missing");
        assert_eq!(line, format!("error:{}: missing", ErrCode::NotFound.code()));
    }

    #[test]
    fn format_with_position() {
        let mut pos = Position::new();
        pos.set_filename("a.ajs");
        pos.new_line();
        let line = format_message(MessageLevel::Warning, ErrCode::NotAllowed, &pos, "nope");
        assert_eq!(
            line,
            format!("warning:{}: in a.ajs(2:1): nope", ErrCode::NotAllowed.code())
        );
    }

    #[test]
    fn counters_and_capture() {
        let _guard = TEST_LOCK.lock().unwrap();
        let (tx, rx) = channel();
        set_message_callback(Box::new(Capture(tx)));
        reset_counters();

        let pos = Position::new();
        error(ErrCode::NotFound, &pos, "one");
        warning(ErrCode::NotAllowed, &pos, "two");

        assert_eq!(error_count(), 1);
        assert_eq!(warning_count(), 1);
        let first = rx.recv().unwrap();
        assert!(first.starts_with("error:"));
        let second = rx.recv().unwrap();
        assert!(second.starts_with("warning:"));
    }

    #[test]
    fn level_names_are_lowercase() {
        assert_eq!(MessageLevel::Fatal.as_str(), "fatal");
        assert_eq!(MessageLevel::Trace.as_str(), "trace");
    }

    #[test]
    fn fatal_builds_error_value() {
        let _guard = TEST_LOCK.lock().unwrap();
        set_message_callback(Box::new(DefaultCallback));
        set_message_level(MessageLevel::Off);
        let pos = Position::new();
        let err = fatal(ErrCode::Installation, &pos, "bad install");
        assert_eq!(err.code, ErrCode::Installation);
        assert!(err.to_string().contains("bad install"));
        set_message_level(MessageLevel::Info);
    }
}
