//! Core metadata (`METADATA` / `PKG-INFO`) parsing.
//!
//! The format is a block of RFC 822 style `Key: value` header lines,
//! optionally followed by a blank line and a free-form body holding the
//! long description. Folded continuation lines are kept verbatim so the
//! serialized output matches the input.

use thiserror::Error;

/// Error parsing core metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("line {line}: expected `Key: value`, found {content:?}")]
    InvalidHeader { line: usize, content: String },

    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Parsed core metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreMetadata {
    fields: Vec<(String, String)>,
    body: Option<String>,
}

impl CoreMetadata {
    /// Parse metadata text.
    pub fn parse(text: &str) -> Result<Self, MetadataError> {
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut body = None;

        let mut rest = text;
        let mut line_no = 0;
        while !rest.is_empty() {
            let (line, remainder) = match rest.find('\n') {
                Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                None => (rest, ""),
            };
            line_no += 1;
            let line = line.strip_suffix('\r').unwrap_or(line);

            if line.is_empty() {
                if !remainder.is_empty() {
                    body = Some(remainder.to_string());
                }
                break;
            }

            if line.starts_with([' ', '\t']) {
                match fields.last_mut() {
                    Some((_, value)) => {
                        value.push('\n');
                        value.push_str(line);
                    }
                    None => {
                        return Err(MetadataError::InvalidHeader {
                            line: line_no,
                            content: line.to_string(),
                        })
                    }
                }
            } else {
                let (key, value) =
                    line.split_once(':')
                        .ok_or_else(|| MetadataError::InvalidHeader {
                            line: line_no,
                            content: line.to_string(),
                        })?;
                if key.is_empty() || key.contains(char::is_whitespace) {
                    return Err(MetadataError::InvalidHeader {
                        line: line_no,
                        content: line.to_string(),
                    });
                }
                fields.push((key.to_string(), value.trim_start().to_string()));
            }

            rest = remainder;
        }

        Ok(CoreMetadata { fields, body })
    }

    /// First value of a field (case-insensitive key).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a repeatable field, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Remove every occurrence of a field. Returns how many were removed.
    pub fn remove_all(&mut self, key: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        before - self.fields.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("Version")
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Check the fields required to publish a stub: a name, a version and a license.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if !self.contains("Name") {
            return Err(MetadataError::MissingField("Name"));
        }
        if !self.contains("Version") {
            return Err(MetadataError::MissingField("Version"));
        }
        if !self.contains("License") && !self.contains("License-Expression") {
            return Err(MetadataError::MissingField("License"));
        }
        Ok(())
    }

    /// Requirements that point at a direct URL (`name @ https://...`).
    ///
    /// A stub carrying these cannot be uploaded to the default index.
    pub fn direct_references(&self) -> Vec<&str> {
        self.get_all("Requires-Dist")
            .filter(|req| req.contains('@'))
            .collect()
    }

    /// Serialize back to metadata text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        if let Some(ref body) = self.body {
            out.push_str(body);
        }
        out
    }
}
