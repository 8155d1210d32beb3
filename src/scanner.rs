//! Boundary scanning for streamed JSON arrays.
//!
//! The scanner consumes arbitrary text chunks and emits each syntactically
//! complete top-level object the moment its closing brace arrives, however the
//! input happens to be split. It never parses: it only tracks string/escape
//! state and brace depth, so one pass over the bytes is enough and an object
//! may span any number of chunks.

use crate::error::ScanError;

/// Incremental scanner over a growing text buffer.
///
/// Expects the overall input to be a JSON array of objects. The enclosing
/// brackets, commas and whitespace are never matched as `{`/`}` and fall into
/// discarded separator text. Objects nested inside arrays-of-arrays at the top
/// level are not supported.
#[derive(Debug)]
pub struct ObjectScanner {
    buf: String,
    /// Bytes of `buf` already examined.
    scanned: usize,
    depth: u32,
    in_string: bool,
    escape_next: bool,
    /// Offset of the `{` that opened the current top-level object.
    start: Option<usize>,
}

impl ObjectScanner {
    pub fn new() -> Self {
        ObjectScanner {
            buf: String::new(),
            scanned: 0,
            depth: 0,
            in_string: false,
            escape_next: false,
            start: None,
        }
    }

    /// Append a chunk and return every top-level object completed by it.
    ///
    /// Unconsumed trailing text (an open object, or inter-object separators)
    /// is retained and rescanned together with the next chunk. Scanning is
    /// byte-wise: all structural characters are ASCII, and UTF-8 continuation
    /// bytes can never collide with them.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buf.push_str(chunk);
        let mut objects = Vec::new();

        let bytes = self.buf.as_bytes();
        let len = bytes.len();
        let mut i = self.scanned;
        while i < len {
            let b = bytes[i];
            if self.escape_next {
                self.escape_next = false;
            } else if self.in_string {
                match b {
                    b'\\' => self.escape_next = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
            } else {
                match b {
                    b'"' => self.in_string = true,
                    b'{' => {
                        self.depth += 1;
                        if self.depth == 1 {
                            self.start = Some(i);
                        }
                    }
                    b'}' if self.depth > 0 => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            if let Some(start) = self.start.take() {
                                objects.push(self.buf[start..=i].to_string());
                            }
                        }
                    }
                    // Stray ']'/'}'/',' at depth 0 belong to the enclosing
                    // array and are skipped as separator text.
                    _ => {}
                }
            }
            i += 1;
        }
        self.scanned = len;

        // Compact: everything before the open object (or the whole buffer, if
        // no object is open) has been consumed.
        match self.start {
            Some(start) if start > 0 => {
                self.buf.drain(..start);
                self.scanned -= start;
                self.start = Some(0);
            }
            None => {
                self.buf.clear();
                self.scanned = 0;
            }
            _ => {}
        }

        objects
    }

    /// Signal end of input. Errors if a top-level object was left open.
    pub fn finish(&mut self) -> Result<(), ScanError> {
        let open = self.depth > 0 || self.start.is_some();
        let buffered = self.buf.len();
        self.reset();
        if open {
            Err(ScanError { buffered })
        } else {
            Ok(())
        }
    }

    /// Return to the empty state, ready for a fresh stream.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scanned = 0;
        self.depth = 0;
        self.in_string = false;
        self.escape_next = false;
        self.start = None;
    }
}

impl Default for ObjectScanner {
    fn default() -> Self {
        Self::new()
    }
}
