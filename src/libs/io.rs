use anyhow::Context;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Open a file for buffered reading, decompressing `.gz` (multi-member) and `.xz` on the fly.
/// `stdin` reads standard input. The reader is `Send`, so it can feed a pipeline thread.
///
/// ```
/// use std::io::BufRead;
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("list.txt");
/// std::fs::write(&path, "a\nb\nc\n").unwrap();
///
/// let reader = mof::reader(path.to_str().unwrap()).unwrap();
/// assert_eq!(reader.lines().count(), 3);
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead + Send>> {
    if input == "stdin" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }

    let path = Path::new(input);
    let file = std::fs::File::open(path)
        .with_context(|| format!("could not open {}", path.display()))?;

    let reader: Box<dyn BufRead + Send> = match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file))),
        Some("xz") => Box::new(BufReader::new(xz2::read::XzDecoder::new_multi_decoder(
            file,
        ))),
        _ => Box::new(BufReader::new(file)),
    };

    Ok(reader)
}

/// Buffered writer to a file, or to standard output for `stdout`.
pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}
