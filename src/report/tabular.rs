use std::io::{self, Write};

use crate::core::blast_hits::{Hsp, HspList};
use crate::core::blast_results::HspResults;

pub const TABULAR_FIELDS: [&str; 12] = [
    "qseqid", "sseqid", "score", "bitscore", "evalue", "nident", "qstart", "qend", "sstart",
    "send", "qframe", "sframe",
];

/// Tabular output settings
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether to write a header line before the first HSP
    pub include_header: bool,
    pub delimiter: char,
    /// Number of decimal places for bit score
    pub bit_score_decimals: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            include_header: false,
            delimiter: '\t',
            bit_score_decimals: 1,
        }
    }
}

impl OutputConfig {
    pub fn with_header() -> Self {
        Self {
            include_header: true,
            ..Default::default()
        }
    }
}

/// Format an e-value: scientific with a signed two-digit exponent below
/// 0.001, fixed otherwise. E-values not computed yet print as `*`.
pub fn format_evalue(e_value: f64) -> String {
    if e_value == f64::MAX {
        "*".to_string()
    } else if e_value == 0.0 {
        "0.0".to_string()
    } else if e_value < 0.001 {
        format_scientific(e_value, 2)
    } else {
        format!("{:.6}", e_value)
    }
}

/// `{:e}` with the exponent written as `e-05` rather than `e-5`.
fn format_scientific(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// Writes one line per HSP, naming queries and subjects by id when known.
pub struct TabularWriter<W: Write> {
    writer: W,
    config: OutputConfig,
    query_ids: Vec<String>,
    subject_ids: Vec<String>,
    header_written: bool,
    lines: usize,
}

impl<W: Write> TabularWriter<W> {
    pub fn new(writer: W, config: OutputConfig, query_ids: Vec<String>, subject_ids: Vec<String>) -> Self {
        TabularWriter {
            writer,
            config,
            query_ids,
            subject_ids,
            header_written: false,
            lines: 0,
        }
    }

    /// HSP lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    fn write_header(&mut self) -> io::Result<()> {
        if self.config.include_header && !self.header_written {
            let delim = self.config.delimiter.to_string();
            writeln!(self.writer, "# {}", TABULAR_FIELDS.join(&delim))?;
        }
        self.header_written = true;
        Ok(())
    }

    pub fn write_list(&mut self, list: &HspList) -> io::Result<()> {
        self.write_header()?;
        let query_id = resolve(&self.query_ids, list.query_index, "query");
        let subject_id = resolve(&self.subject_ids, list.oid, "subject");
        for hsp in list.hsps() {
            write_hsp_fields(&mut self.writer, &query_id, &subject_id, hsp, &self.config)?;
            self.lines += 1;
        }
        Ok(())
    }

    /// Every list of `results`, query by query.
    pub fn write_results(&mut self, results: &HspResults) -> io::Result<()> {
        self.write_header()?;
        for (_, list) in results.iter() {
            self.write_list(list)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn resolve(ids: &[String], index: usize, kind: &str) -> String {
    match ids.get(index) {
        Some(id) => id.clone(),
        None => format!("{kind}_{index}"),
    }
}

/// Coordinates are one-based and inclusive in the HSP's frame.
pub fn write_hsp_fields<W: Write>(
    writer: &mut W,
    query_id: &str,
    subject_id: &str,
    hsp: &Hsp,
    config: &OutputConfig,
) -> io::Result<()> {
    let delim = config.delimiter;
    write!(writer, "{}{}{}", query_id, delim, subject_id)?;
    write!(writer, "{}{}", delim, hsp.score)?;
    write!(writer, "{}{:.prec$}", delim, hsp.bit_score, prec = config.bit_score_decimals)?;
    write!(writer, "{}{}", delim, format_evalue(hsp.evalue))?;
    write!(writer, "{}{}", delim, hsp.num_ident)?;
    write!(writer, "{}{}{}{}", delim, hsp.query.offset + 1, delim, hsp.query.end)?;
    write!(writer, "{}{}{}{}", delim, hsp.subject.offset + 1, delim, hsp.subject.end)?;
    write!(writer, "{}{}{}{}", delim, hsp.query.frame, delim, hsp.subject.frame)?;
    writeln!(writer)
}
