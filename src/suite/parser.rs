//! Test file parser
//!
//! A test file holds two sections introduced by marker lines:
//!
//! ```text
//! $$IN:
//! 1 2
//! $$OUT:
//! 3
//! ```
//!
//! Every line after a marker is appended, newline-terminated, to that
//! section. Lines before the first marker are ignored.

use crate::models::TestCase;

const INPUT_MARKER: &[u8] = b"$$IN:";
const OUTPUT_MARKER: &[u8] = b"$$OUT:";

#[derive(Clone, Copy)]
enum Section {
    Input,
    Output,
}

/// Parse the contents of one test file
pub fn parse_test_case(name: impl Into<String>, content: &[u8]) -> TestCase {
    let mut input = Vec::new();
    let mut output = Vec::new();
    let mut section = None;

    for line in lines(content) {
        match line {
            INPUT_MARKER => section = Some(Section::Input),
            OUTPUT_MARKER => section = Some(Section::Output),
            _ => {
                let buf = match section {
                    Some(Section::Input) => &mut input,
                    Some(Section::Output) => &mut output,
                    None => continue,
                };
                buf.extend_from_slice(line);
                buf.push(b'\n');
            }
        }
    }

    TestCase::new(name, input, output)
}

/// Split on `\n`, dropping a trailing `\r` and the empty piece after a final newline
fn lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    let empty = content.is_empty();

    body.split(|&b| b == b'\n')
        .filter(move |_| !empty)
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}
