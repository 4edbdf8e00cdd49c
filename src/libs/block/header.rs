use super::error::BlockError;

/// Shape of the header that opens a node's block.
///
/// With the defaults a block starts at a line like `>GCA_000123.1@c1`: the record
/// prefix `>`, the node identifier, the delimiter `@` and the marker `c1`.
/// Continuation records of the same node carry other markers (`@c2`, ...) or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFormat {
    pub prefix: u8,
    pub delimiter: char,
    pub marker: String,
}

impl Default for HeaderFormat {
    fn default() -> Self {
        Self {
            prefix: b'>',
            delimiter: '@',
            marker: "c1".to_string(),
        }
    }
}

impl HeaderFormat {
    pub fn new(delimiter: char, marker: &str) -> Self {
        Self {
            delimiter,
            marker: marker.to_string(),
            ..Self::default()
        }
    }

    /// Does `line` (terminator included or not) open a new block?
    pub fn is_block_start(&self, line: &[u8]) -> bool {
        if line.first() != Some(&self.prefix) {
            return false;
        }
        let line = trim_eol(line);

        let mut tail = [0u8; 4];
        let delim = self.delimiter.encode_utf8(&mut tail).as_bytes();
        let marker = self.marker.as_bytes();

        line.len() > delim.len() + marker.len()
            && line.ends_with(marker)
            && line[..line.len() - marker.len()].ends_with(delim)
    }

    /// Identifier of the node owning the block opened by `header`: the text between
    /// the prefix and the first delimiter.
    ///
    /// `line` is the 1-based position of the header in the source, used for errors.
    ///
    /// ```
    /// use mof::libs::block::HeaderFormat;
    ///
    /// let fmt = HeaderFormat::default();
    /// assert_eq!(fmt.parse_node_id(b">SAMN01@c1\n", 1).unwrap(), "SAMN01");
    /// assert!(fmt.parse_node_id(b">@c1\n", 1).is_err());
    /// assert!(fmt.parse_node_id(b"ACGT\n", 2).is_err());
    /// ```
    pub fn parse_node_id(&self, header: &[u8], line: usize) -> Result<String, BlockError> {
        let malformed = |reason| BlockError::MalformedHeader {
            line,
            header: String::from_utf8_lossy(trim_eol(header)).into_owned(),
            reason,
        };

        let body = match header.split_first() {
            Some((first, rest)) if *first == self.prefix => trim_eol(rest),
            _ => return Err(malformed("not a header line")),
        };
        let body = std::str::from_utf8(body).map_err(|_| malformed("header is not UTF-8"))?;

        let (node, _) = body
            .split_once(self.delimiter)
            .ok_or_else(|| malformed("missing delimiter"))?;
        if node.trim().is_empty() {
            return Err(malformed("empty node identifier"));
        }

        Ok(node.to_string())
    }
}

/// Strip one trailing `\n` or `\r\n`
fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_start_detection() {
        let fmt = HeaderFormat::default();
        assert!(fmt.is_block_start(b">n1@c1\n"));
        assert!(fmt.is_block_start(b">n1@c1\r\n"));
        assert!(fmt.is_block_start(b">n1@c1"));
        assert!(!fmt.is_block_start(b">n1@c2\n"));
        assert!(!fmt.is_block_start(b">n1@c11\n"));
        assert!(!fmt.is_block_start(b">n1c1\n"));
        assert!(!fmt.is_block_start(b"ACGT@c1\n"));
        assert!(!fmt.is_block_start(b"\n"));
    }

    #[test]
    fn node_id_up_to_first_delimiter() {
        let fmt = HeaderFormat::default();
        assert_eq!(fmt.parse_node_id(b">n1@c1\n", 1).unwrap(), "n1");
        assert_eq!(fmt.parse_node_id(b">n1@c2\n", 1).unwrap(), "n1");
        assert_eq!(fmt.parse_node_id(b">n1@x@c1\n", 1).unwrap(), "n1");
        assert_eq!(fmt.parse_node_id(b">GCA_1.1@c1\r\n", 1).unwrap(), "GCA_1.1");
    }

    #[test]
    fn malformed_headers() {
        let fmt = HeaderFormat::default();
        let cases: [(&[u8], &str); 4] = [
            (b">@c1\n", "empty node identifier"),
            (b">n1\n", "missing delimiter"),
            (b"ACGT\n", "not a header line"),
            (b"", "not a header line"),
        ];
        for (header, expected) in cases {
            match fmt.parse_node_id(header, 7) {
                Err(BlockError::MalformedHeader { line, reason, .. }) => {
                    assert_eq!(line, 7);
                    assert_eq!(reason, expected);
                }
                res => panic!("Expected MalformedHeader, got {:?}", res),
            }
        }
    }

    #[test]
    fn custom_format() {
        let fmt = HeaderFormat::new('|', "first");
        assert!(fmt.is_block_start(b">leaf_7|first\n"));
        assert!(!fmt.is_block_start(b">leaf_7@c1\n"));
        assert_eq!(fmt.parse_node_id(b">leaf_7|first\n", 1).unwrap(), "leaf_7");
    }
}
