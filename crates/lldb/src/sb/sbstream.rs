use super::*;

/// Append-only text sink that descriptions are written into.
#[derive(Clone, Default)]
pub struct SBStream {
    data: String,
}

impl SBStream {
    pub fn new() -> SBStream {
        SBStream { data: String::new() }
    }
    pub fn is_valid(&self) -> bool {
        true
    }
    pub fn data(&self) -> &str {
        &self.data
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn clear(&mut self) {
        self.data.clear();
    }
    /// Terminates the current line, unless the stream already ends with one.
    pub fn eol(&mut self) {
        if !self.data.ends_with('\n') {
            self.data.push('\n');
        }
    }
}

impl fmt::Write for SBStream {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.data.push_str(s);
        Ok(())
    }
}

impl fmt::Debug for SBStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.data, f)
    }
}

#[test]
fn test_eol() {
    use std::fmt::Write;

    let mut stream = SBStream::new();
    assert!(stream.is_valid());
    stream.eol();
    assert_eq!(stream.data(), "\n");
    write!(stream, "a").unwrap();
    stream.eol();
    stream.eol();
    assert_eq!(stream.data(), "\na\n");
    stream.clear();
    assert!(stream.is_empty());
}
