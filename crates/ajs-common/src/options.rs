//! Dialect options toggled by `use` pragmas.
//!
//! The parser consults these while recognizing extended operators and
//! statements, and pragmas encountered in the source mutate them as the
//! parse goes on. The compiler shares the same set, so a pragma in a
//! file affects the resolution of the rest of that file.

/// Every option a pragma can set or query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerOption {
    AllowWith,
    Coverage,
    Debug,
    ExtendedEscapeSequences,
    ExtendedOperators,
    ExtendedStatements,
    Octal,
    Strict,
    Trace,
    UnsafeMath,
    UserScript,
}

const OPTION_COUNT: usize = 11;

/// Value attached to an option. Most options are boolean (0 or 1) but a
/// pragma may set any scalar (e.g. `use extended_statements(2);` turns
/// on the forced-block bit).
pub type OptionValue = i64;

/// The set of option values for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    values: [OptionValue; OPTION_COUNT],
}

impl Options {
    /// All options start turned off.
    pub fn new() -> Self {
        Self {
            values: [0; OPTION_COUNT],
        }
    }

    pub fn set_option(&mut self, option: CompilerOption, value: OptionValue) {
        self.values[option as usize] = value;
    }

    pub fn get_option(&self, option: CompilerOption) -> OptionValue {
        self.values[option as usize]
    }

    /// Whether the option is set to a non-zero value.
    pub fn is_set(&self, option: CompilerOption) -> bool {
        self.get_option(option) != 0
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_start_off() {
        let options = Options::new();
        assert_eq!(options.get_option(CompilerOption::Strict), 0);
        assert!(!options.is_set(CompilerOption::ExtendedOperators));
    }

    #[test]
    fn set_and_get() {
        let mut options = Options::new();
        options.set_option(CompilerOption::ExtendedOperators, 1);
        options.set_option(CompilerOption::ExtendedStatements, 2);
        assert!(options.is_set(CompilerOption::ExtendedOperators));
        assert_eq!(options.get_option(CompilerOption::ExtendedStatements), 2);
    }

    #[test]
    fn options_are_independent() {
        let mut options = Options::new();
        options.set_option(CompilerOption::Octal, 1);
        assert!(!options.is_set(CompilerOption::Strict));
        options.set_option(CompilerOption::Octal, 0);
        assert!(!options.is_set(CompilerOption::Octal));
    }
}
