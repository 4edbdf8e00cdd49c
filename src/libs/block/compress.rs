use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

/// Block (de)compression.
///
/// Blocks are compressed one at a time and stitched together by raw byte concatenation,
/// so an implementation used for partitioning or building must report `is_concatenable()`:
/// the concatenation of N compressed members has to decode to the concatenation of
/// their N payloads.
pub trait Compressor: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    fn is_concatenable(&self) -> bool;

    /// File name suffix of compressed artifacts, without the leading dot (e.g. `fa.gz`)
    fn extension(&self) -> &str;
}

/// Multi-member gzip via flate2
#[derive(Debug, Clone)]
pub struct Gzip {
    level: u32,
}

impl Gzip {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Default for Gzip {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for Gzip {
    fn name(&self) -> &str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut enc =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::new(self.level));
        enc.write_all(data)?;
        enc.finish()
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        flate2::read::MultiGzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }

    fn is_concatenable(&self) -> bool {
        true
    }

    fn extension(&self) -> &str {
        "fa.gz"
    }
}

/// BGZF (blocked gzip). Every block ends with its own EOF marker, which is an empty
/// gzip member, so concatenated blocks stay a valid BGZF/gzip stream.
#[derive(Debug, Clone, Default)]
pub struct Bgzf {
    level: Option<u8>,
}

impl Bgzf {
    pub fn new(level: Option<u8>) -> Self {
        Self {
            level: level.map(|l| l.min(9)),
        }
    }
}

impl Compressor for Bgzf {
    fn name(&self) -> &str {
        "bgzf"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut builder = noodles_bgzf::writer::Builder::default();
        if let Some(level) = self.level {
            if let Some(level) = noodles_bgzf::writer::CompressionLevel::new(level) {
                builder = builder.set_compression_level(level);
            }
        }
        let mut writer = builder.build_from_writer(Vec::new());
        writer.write_all(data)?;
        writer.finish()
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        flate2::read::MultiGzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }

    fn is_concatenable(&self) -> bool {
        true
    }

    fn extension(&self) -> &str {
        "fa.gz"
    }
}

/// No compression at all; plain text concatenates trivially.
#[derive(Debug, Clone, Default)]
pub struct Plain;

impl Compressor for Plain {
    fn name(&self) -> &str {
        "plain"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn is_concatenable(&self) -> bool {
        true
    }

    fn extension(&self) -> &str {
        "fa"
    }
}

/// Pipes data through external programs, e.g. `gzip -c` / `gzip -dc`.
///
/// Concatenability is whatever the caller declares for the tool.
#[derive(Debug, Clone)]
pub struct External {
    name: String,
    compress_cmd: Vec<String>,
    decompress_cmd: Vec<String>,
    extension: String,
    concatenable: bool,
}

impl External {
    pub fn new(
        compress_cmd: &[&str],
        decompress_cmd: &[&str],
        extension: &str,
        concatenable: bool,
    ) -> Self {
        Self {
            name: compress_cmd.join(" "),
            compress_cmd: compress_cmd.iter().map(|s| s.to_string()).collect(),
            decompress_cmd: decompress_cmd.iter().map(|s| s.to_string()).collect(),
            extension: extension.to_string(),
            concatenable,
        }
    }

    /// `gzip -c` / `gzip -dc` found on PATH
    pub fn gzip() -> io::Result<Self> {
        which::which("gzip").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        Ok(Self::new(&["gzip", "-c"], &["gzip", "-dc"], "fa.gz", true))
    }

    fn pipe(cmd: &[String], data: &[u8]) -> io::Result<Vec<u8>> {
        let (program, args) = cmd
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdin"))?;

        // Feed stdin from a second thread, otherwise a full stdout pipe deadlocks both sides
        let output = std::thread::scope(|s| {
            let feeder = s.spawn(move || stdin.write_all(data));
            let output = child.wait_with_output();
            let fed = feeder
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "feeder panicked")));
            fed.and(output)
        })?;

        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("`{}` exited with {}", cmd.join(" "), output.status),
            ));
        }
        Ok(output.stdout)
    }
}

impl Compressor for External {
    fn name(&self) -> &str {
        &self.name
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        Self::pipe(&self.compress_cmd, data)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        Self::pipe(&self.decompress_cmd, data)
    }

    fn is_concatenable(&self) -> bool {
        self.concatenable
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

/// Compressor selected by name on the command line.
pub fn by_name(name: &str, level: Option<u32>) -> anyhow::Result<Box<dyn Compressor>> {
    let compressor: Box<dyn Compressor> = match name {
        "gzip" => Box::new(level.map(Gzip::new).unwrap_or_default()),
        "bgzf" => Box::new(Bgzf::new(level.map(|l| l.min(9) as u8))),
        "plain" => Box::new(Plain),
        "external-gzip" => Box::new(External::gzip()?),
        _ => anyhow::bail!("Unknown compressor: {}", name),
    };
    Ok(compressor)
}
