use crate::config::Config;
use crate::record::{Alphabet, Record};
use anyhow::{Context, Result, anyhow, bail};
use flate2::Compression;
use flate2::write::GzEncoder;
use needletail::errors::ParseErrorKind;
use needletail::{FastxReader, parse_fastx_file};
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};

/// Fail early, naming the file, if any input cannot be opened.
pub fn check_readable(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        File::open(path).with_context(|| format!("cannot read from file {}", path.display()))?;
    }
    Ok(())
}

/// Records of one read direction, read from one or more files in order.
/// Gzipped input is detected by needletail.
pub struct FastqSource {
    paths: Vec<PathBuf>,
    next_path: usize,
    current: Option<(PathBuf, Box<dyn FastxReader>)>,
    alphabet: Alphabet,
    failed: bool,
}

impl FastqSource {
    pub fn new(paths: Vec<PathBuf>, alphabet: Alphabet) -> Self {
        Self {
            paths,
            next_path: 0,
            current: None,
            alphabet,
            failed: false,
        }
    }

    /// Open the next non-empty file; `Ok(false)` once all files are consumed.
    fn open_next(&mut self) -> Result<bool> {
        while self.next_path < self.paths.len() {
            let path = self.paths[self.next_path].clone();
            self.next_path += 1;
            match parse_fastx_file(&path) {
                Ok(reader) => {
                    tracing::debug!(path = %path.display(), "reading FASTQ");
                    self.current = Some((path, reader));
                    return Ok(true);
                }
                Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => {
                    tracing::debug!(path = %path.display(), "skipping empty input");
                }
                Err(e) => {
                    return Err(anyhow!("failed to open FASTQ {}: {}", path.display(), e));
                }
            }
        }
        Ok(false)
    }

    fn read_record(&mut self) -> Option<Result<Record>> {
        loop {
            if self.current.is_none() {
                match self.open_next() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }
            let (path, reader) = self.current.as_mut()?;
            match reader.next() {
                Some(Ok(rec)) => {
                    let id = String::from_utf8_lossy(rec.id()).into_owned();
                    let Some(quality) = rec.qual() else {
                        return Some(Err(anyhow!(
                            "{}: record {} has no quality line; expecting FASTQ",
                            path.display(),
                            id
                        )));
                    };
                    let record = Record {
                        id,
                        sequence: rec.seq().to_vec(),
                        separator: separator_line(rec.all()),
                        quality: quality.to_vec(),
                    };
                    let checked = self
                        .alphabet
                        .validate(&record)
                        .with_context(|| format!("invalid FASTQ record in {}", path.display()));
                    return Some(checked.map(|()| record));
                }
                Some(Err(e)) => {
                    return Some(Err(anyhow!(
                        "failed to parse FASTQ record in {}: {}",
                        path.display(),
                        e
                    )));
                }
                None => self.current = None,
            }
        }
    }
}

/// Third line of a raw FASTQ record, as written in the input.
fn separator_line(raw: &[u8]) -> String {
    match raw.split(|&b| b == b'\n').nth(2) {
        Some(line) => String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line)).into_owned(),
        None => "+".to_string(),
    }
}

impl Iterator for FastqSource {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.read_record();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

/// Plain, gzipped or stdout FASTQ writer.
pub enum FastqWriter {
    Stdout(BufWriter<Stdout>),
    Plain(BufWriter<File>),
    Gzipped(GzEncoder<BufWriter<File>>),
}

impl FastqWriter {
    /// Create `path` (gzipped when it ends in `.gz`), or use stdout.
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(FastqWriter::Stdout(BufWriter::new(io::stdout())));
        };
        let file = File::create(path)
            .with_context(|| format!("cannot write to file {}", path.display()))?;
        let writer = BufWriter::new(file);
        if path.extension().is_some_and(|ext| ext == "gz") {
            Ok(FastqWriter::Gzipped(GzEncoder::new(writer, Compression::default())))
        } else {
            Ok(FastqWriter::Plain(writer))
        }
    }

    /// Write one record as a single buffer, so its four lines are never split.
    pub fn write_record(&mut self, record: &Record, tag: &str) -> io::Result<()> {
        self.write_all(&record.to_fastq(tag))
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            FastqWriter::Stdout(mut w) => w.flush(),
            FastqWriter::Plain(mut w) => w.flush(),
            FastqWriter::Gzipped(w) => w.finish()?.flush(),
        }
    }
}

impl Write for FastqWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FastqWriter::Stdout(w) => w.write(buf),
            FastqWriter::Plain(w) => w.write(buf),
            FastqWriter::Gzipped(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FastqWriter::Stdout(w) => w.flush(),
            FastqWriter::Plain(w) => w.flush(),
            FastqWriter::Gzipped(w) => w.flush(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Main,
    MateForward,
    MateReverse,
}

/// The main output plus the optional separate files for unmerged mates.
pub struct OutputSink {
    main: FastqWriter,
    mates: Option<(FastqWriter, FastqWriter)>,
}

impl OutputSink {
    /// Create every output file up front so unwritable paths fail before any
    /// read is processed.
    pub fn open(config: &Config) -> Result<Self> {
        let main = FastqWriter::create(config.output.as_deref())?;
        let mates = match &config.mate_pair_output {
            Some(files) => Some((
                FastqWriter::create(Some(&files.forward))?,
                FastqWriter::create(Some(&files.reverse))?,
            )),
            None => None,
        };
        Ok(Self { main, mates })
    }

    pub fn has_mate_files(&self) -> bool {
        self.mates.is_some()
    }

    /// Mate destinations fall back to the main output when no mate files exist.
    pub fn write(&mut self, destination: Destination, record: &Record, tag: &str) -> Result<()> {
        let writer = match (destination, self.mates.as_mut()) {
            (Destination::MateForward, Some((forward, _))) => forward,
            (Destination::MateReverse, Some((_, reverse))) => reverse,
            _ => &mut self.main,
        };
        writer
            .write_record(record, tag)
            .context("failed to write FASTQ record")
    }

    pub fn finish(self) -> Result<()> {
        self.main.finish().context("failed to finish main output")?;
        if let Some((forward, reverse)) = self.mates {
            forward.finish().context("failed to finish forward mate output")?;
            reverse.finish().context("failed to finish reverse mate output")?;
        }
        Ok(())
    }
}

/// Report sink: the `--log` file when given, stderr otherwise.
pub fn open_log(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot write to file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stderr())),
    }
}

/// Reject a path listed as both forward and reverse input.
pub fn check_distinct(forward: &[PathBuf], reverse: &[PathBuf]) -> Result<()> {
    if let Some(shared) = forward.iter().find(|p| reverse.contains(p)) {
        bail!("{} is given as both forward and reverse input", shared.display());
    }
    Ok(())
}
