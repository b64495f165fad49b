use std::fmt;

use serde::Serialize;

/// Default value of the line/page/paragraph counters.
pub const DEFAULT_COUNTER: u32 = 1;

/// A location in an input file.
///
/// Positions are attached to every token and every node and are carried
/// by every diagnostic. Lines and columns are 1-based. The page and
/// paragraph counters exist for tools that paginate their output; a
/// page break resets the in-page line counter, an empty line starts a
/// new paragraph. Serialized by tools which dump token streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    filename: String,
    function: String,
    line: u32,
    column: u32,
    page: u32,
    page_line: u32,
    paragraph: u32,
}

impl Position {
    pub fn new() -> Self {
        Self {
            filename: String::new(),
            function: String::new(),
            line: DEFAULT_COUNTER,
            column: DEFAULT_COUNTER,
            page: DEFAULT_COUNTER,
            page_line: DEFAULT_COUNTER,
            paragraph: DEFAULT_COUNTER,
        }
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_function(&mut self, function: impl Into<String>) {
        self.function = function.into();
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Restart the counters at the top of a file (or any counter value
    /// a stream wishes to resume from).
    pub fn reset_counters(&mut self, line: u32) {
        self.line = line;
        self.column = DEFAULT_COUNTER;
        self.page = DEFAULT_COUNTER;
        self.page_line = DEFAULT_COUNTER;
        self.paragraph = DEFAULT_COUNTER;
    }

    /// Advance to the next line; resets the column.
    pub fn new_line(&mut self) {
        self.line += 1;
        self.page_line += 1;
        self.column = DEFAULT_COUNTER;
    }

    /// Advance the column by one character.
    pub fn new_column(&mut self) {
        self.column += 1;
    }

    /// Advance to the next page; resets the in-page line counter.
    pub fn new_page(&mut self) {
        self.page += 1;
        self.page_line = DEFAULT_COUNTER;
        self.column = DEFAULT_COUNTER;
    }

    /// Advance to the next paragraph.
    pub fn new_paragraph(&mut self) {
        self.paragraph += 1;
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_line(&self) -> u32 {
        self.page_line
    }

    pub fn paragraph(&self) -> u32 {
        self.paragraph
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filename.is_empty() {
            write!(f, "line {}:{}", self.line, self.column)
        } else {
            write!(f, "{}({}:{})", self.filename, self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_counters() {
        let pos = Position::new();
        assert_eq!(pos.line(), 1);
        assert_eq!(pos.column(), 1);
        assert_eq!(pos.page(), 1);
        assert_eq!(pos.paragraph(), 1);
        assert_eq!(pos.filename(), "");
    }

    #[test]
    fn new_line_resets_column() {
        let mut pos = Position::new();
        pos.new_column();
        pos.new_column();
        assert_eq!(pos.column(), 3);
        pos.new_line();
        assert_eq!(pos.line(), 2);
        assert_eq!(pos.column(), 1);
        assert_eq!(pos.page_line(), 2);
    }

    #[test]
    fn new_page_resets_page_line() {
        let mut pos = Position::new();
        pos.new_line();
        pos.new_line();
        assert_eq!(pos.page_line(), 3);
        pos.new_page();
        assert_eq!(pos.page(), 2);
        assert_eq!(pos.page_line(), 1);
        // the absolute line counter is not affected by pages
        assert_eq!(pos.line(), 3);
    }

    #[test]
    fn display_with_and_without_filename() {
        let mut pos = Position::new();
        pos.new_line();
        assert_eq!(pos.to_string(), "line 2:1");
        pos.set_filename("test.ajs");
        assert_eq!(pos.to_string(), "test.ajs(2:1)");
    }

    #[test]
    fn reset_counters_restarts_from_given_line() {
        let mut pos = Position::new();
        pos.new_line();
        pos.new_paragraph();
        pos.reset_counters(9);
        assert_eq!(pos.line(), 9);
        assert_eq!(pos.column(), 1);
        assert_eq!(pos.paragraph(), 1);
    }
}
