use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::io::Write;

lazy_static! {
    static ref REDACTION_REGEX: Regex = Regex::new(
        r"(?i)(Bearer\s+[^\s,;]+|x-api-key:\s*[^\s,;]+)"
    ).expect("Invalid redaction regex");
    static ref QUERY_SECRET_REGEX: Regex = Regex::new(
        r"(?i)([?&](?:api_key|apikey|access_token|token)=)[^&\s]+"
    ).expect("Invalid query secret regex");
}

/// Strip credentials from a log line: bearer headers, api key headers and
/// secret query parameters in URLs.
pub fn redact(input: &str) -> Cow<'_, str> {
    let headers = REDACTION_REGEX.replace_all(input, "[REDACTED]");
    if !QUERY_SECRET_REGEX.is_match(&headers) {
        return headers;
    }
    let cleaned = QUERY_SECRET_REGEX
        .replace_all(&headers, "${1}[REDACTED]")
        .into_owned();
    Cow::Owned(cleaned)
}

/// Writer adapter for the log file. Every buffer passes through [`redact`]
/// before it reaches disk.
pub struct RedactingWriter<W: Write> {
    inner: W,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let redacted = redact(&input);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
