use anyhow::{Result, bail};

/// One FASTQ record. `id` is stored without the leading `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub sequence: Vec<u8>,
    pub separator: String,
    pub quality: Vec<u8>,
}

impl Record {
    pub fn new(id: impl Into<String>, sequence: &[u8], quality: &[u8]) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.to_vec(),
            separator: "+".to_string(),
            quality: quality.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Keep only the first `len` bases (and qualities).
    pub fn truncate(&mut self, len: usize) {
        self.sequence.truncate(len);
        self.quality.truncate(len);
    }

    /// Keep the half-open range `[start, end)`.
    pub fn slice(&mut self, start: usize, end: usize) {
        let end = end.min(self.sequence.len());
        let start = start.min(end);
        self.sequence.truncate(end);
        self.quality.truncate(end);
        self.sequence.drain(..start);
        self.quality.drain(..start);
    }

    pub fn contains_unknown(&self) -> bool {
        self.sequence.iter().any(|&b| is_unknown(b))
    }

    /// Serialize as four FASTQ lines, splicing `tag` in after the `@`.
    pub fn to_fastq(&self, tag: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.id.len() + tag.len() + self.sequence.len() * 2 + self.separator.len() + 5,
        );
        out.push(b'@');
        out.extend_from_slice(tag.as_bytes());
        out.extend_from_slice(self.id.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&self.sequence);
        out.push(b'\n');
        out.extend_from_slice(self.separator.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&self.quality);
        out.push(b'\n');
        out
    }
}

/// What travels through the queues between the clip workers and the merge worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Record(Record),
    /// The read failed a clip-stage check and must not be written.
    Rejected,
    /// The producer is done; nothing follows on this queue.
    Terminated,
}

/// Only uppercase `N`; a lowercase `n` scores like any other base.
pub fn is_unknown(base: u8) -> bool {
    base == b'N'
}

pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        other => other,
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Decode an ASCII quality character into a Phred score.
pub fn phred(quality: u8, offset: u8) -> i32 {
    quality as i32 - offset as i32
}

/// Which nucleotide characters a parsed record may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alphabet {
    pub allow_n: bool,
    pub allow_u: bool,
    pub allow_lowercase: bool,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            allow_n: true,
            allow_u: true,
            allow_lowercase: true,
        }
    }
}

impl Alphabet {
    pub fn accepts(&self, base: u8) -> bool {
        let upper = if self.allow_lowercase {
            base.to_ascii_uppercase()
        } else {
            base
        };
        match upper {
            b'A' | b'C' | b'G' | b'T' => true,
            b'N' => self.allow_n,
            b'U' => self.allow_u,
            _ => false,
        }
    }

    pub fn validate(&self, record: &Record) -> Result<()> {
        if let Some(&bad) = record.sequence.iter().find(|&&b| !self.accepts(b)) {
            bail!(
                "record {}: invalid nucleotide '{}' in sequence {}",
                record.id,
                bad as char,
                String::from_utf8_lossy(&record.sequence)
            );
        }
        if record.sequence.len() != record.quality.len() {
            bail!(
                "record {}: quality length {} does not match sequence length {}",
                record.id,
                record.quality.len(),
                record.sequence.len()
            );
        }
        Ok(())
    }
}
