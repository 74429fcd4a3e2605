//! Shape of the editable table
//!
//! The gateway treats table content as an opaque blob. The shape is only a
//! best-effort summary for the operator, computed from CSV structure without
//! interpreting any field values.

use std::fmt;

use serde::Serialize;

/// Data rows and columns of a CSV table (header row excluded)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableShape {
    pub rows: usize,
    pub columns: usize,
}

impl TableShape {
    /// Measure CSV content
    ///
    /// Quoted fields may contain commas, doubled quotes and line breaks.
    /// Blank lines are ignored. The column count comes from the header.
    pub fn measure(content: &[u8]) -> Self {
        let text = String::from_utf8_lossy(content);

        let mut records = 0usize;
        let mut columns = 0usize;
        let mut fields = 1usize;
        let mut has_content = false;
        let mut in_quotes = false;

        let mut finish_record = |fields: usize, has_content: bool| {
            if has_content {
                if records == 0 {
                    columns = fields;
                }
                records += 1;
            }
        };

        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    if in_quotes && chars.peek() == Some(&'"') {
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                    has_content = true;
                }
                ',' if !in_quotes => {
                    fields += 1;
                    has_content = true;
                }
                '\r' | '\n' if !in_quotes => {
                    if c == '\r' && chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    finish_record(fields, has_content);
                    fields = 1;
                    has_content = false;
                }
                _ => has_content = true,
            }
        }
        finish_record(fields, has_content);

        Self {
            rows: records.saturating_sub(1),
            columns,
        }
    }
}

impl fmt::Display for TableShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows × {} columns", self.rows, self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_table() {
        let shape = TableShape::measure(b"night,sleep_onset,wake\n1,22:10,06:30\n2,23:00,07:15\n");
        assert_eq!(shape, TableShape { rows: 2, columns: 3 });
        assert_eq!(shape.to_string(), "2 rows × 3 columns");
    }

    #[test]
    fn test_quoted_fields_and_crlf() {
        let content = b"id,note\r\n1,\"late, restless\"\r\n2,\"said \"\"fine\"\"\nnext line\"\r\n\r\n";
        assert_eq!(TableShape::measure(content), TableShape { rows: 2, columns: 2 });
    }

    #[test]
    fn test_no_trailing_newline_and_blank_lines() {
        assert_eq!(
            TableShape::measure(b"\n\na,b\n\n1,2"),
            TableShape { rows: 1, columns: 2 }
        );
    }

    #[test]
    fn test_empty_and_header_only() {
        assert_eq!(TableShape::measure(b""), TableShape::default());
        assert_eq!(TableShape::measure(b"a,b,c,d"), TableShape { rows: 0, columns: 4 });
    }
}
