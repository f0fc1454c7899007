//! Minimal CSV writing and reading
//!
//! Fields are quoted only when they contain a comma, quote or line break,
//! with embedded quotes doubled. Records end with `\r\n`.

pub const LINE_ENDING: &str = "\r\n";

/// Quote a field when needed
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Append one record, including its line ending
pub fn write_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str(LINE_ENDING);
}

/// Split CSV text into records; quoted fields may span lines
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => record.push(std::mem::take(&mut current)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut current));
                records.push(std::mem::take(&mut record));
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() || !record.is_empty() {
        record.push(current);
        records.push(record);
    }
    records
}

/// Parse a single line into fields
pub fn parse_line(line: &str) -> Vec<String> {
    parse_records(line).into_iter().next().unwrap_or_default()
}
