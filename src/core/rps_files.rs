//! Profile (RPS) database files.
//!
//! A profile database is three files sharing one base name:
//!
//! - `<base>.loo`: word lookup over every profile position
//! - `<base>.rps`: position-specific score rows of all profiles
//! - `<base>.aux`: text parameters (matrix, gap costs, Karlin values)
//!
//! The binary files are arrays of native-endian `i32` starting with a magic
//! number. A magic that only matches after swapping its bytes means the file
//! was built on a machine of the other byte order.
//!
//! Profiles are searched as one pseudo-sequence
//! `[S][profile 0][S][profile 1][S]...[S]`, so profile `i` starts at
//! database position `1 + offsets[i] + i`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::{Mmap, MmapMut};

use super::blast_encoding::{BLASTAA_SIZE, NCBISTDAA_X, PROTEIN_SENTINEL};
use super::blast_lookup::{neighborhood, word_code, WordHit};
use super::blast_stat::{Pssm, SENTINEL_SCORE};
use crate::error::{Result, SearchError};
use crate::sequence::Alphabet;

pub const RPS_LOOKUP_MAGIC: i32 = 7702;
pub const RPS_PSSM_MAGIC: i32 = 7703;

/// magic, word size, alphabet size, cell count
const LOOKUP_HEADER_INTS: usize = 4;
/// magic, profile count
const PSSM_HEADER_INTS: usize = 2;
const MAX_RPS_WORD_SIZE: usize = 4;
const INT: usize = std::mem::size_of::<i32>();

/// Label used for tables that were built in memory.
const IN_MEMORY: &str = "<in-memory>";

fn read_int(bytes: &[u8], index: usize) -> Option<i32> {
    let start = index.checked_mul(INT)?;
    let b = bytes.get(start..start + INT)?;
    Some(i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
}

fn push_int(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_ne_bytes());
}

fn to_int(path: &Path, value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| SearchError::malformed(path, format!("{what} {value} overflows the file format")))
}

fn to_count(path: &Path, value: i32, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| SearchError::malformed(path, format!("negative {what} {value}")))
}

fn check_magic(path: &Path, bytes: &[u8], expected: i32) -> Result<()> {
    let magic = read_int(bytes, 0).ok_or_else(|| SearchError::malformed(path, "file too short for a header"))?;
    if magic == expected {
        Ok(())
    } else if magic.swap_bytes() == expected {
        Err(SearchError::IncompatiblePlatform {
            path: path.to_path_buf(),
        })
    } else {
        Err(SearchError::malformed(
            path,
            format!("magic number {magic}, expected {expected}"),
        ))
    }
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)
        .map_err(|e| SearchError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))?;
    // SAFETY: database files are opened read-only and not modified while mapped.
    let map = unsafe { Mmap::map(&file)? };
    log::debug!("mapped {}: {} bytes", path.display(), map.len());
    Ok(map)
}

/// Read-only anonymous map holding `bytes`.
fn anonymous_map(bytes: &[u8]) -> Result<Mmap> {
    let mut map = MmapMut::map_anon(bytes.len().max(1))?;
    map[..bytes.len()].copy_from_slice(bytes);
    Ok(map.make_read_only()?)
}

/// File names of one profile database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpsPaths {
    pub lookup: PathBuf,
    pub pssm: PathBuf,
    pub params: PathBuf,
}

impl RpsPaths {
    pub fn new(base: &Path) -> Self {
        let with = |ext: &str| {
            let mut name = base.as_os_str().to_owned();
            name.push(ext);
            PathBuf::from(name)
        };
        RpsPaths {
            lookup: with(".loo"),
            pssm: with(".rps"),
            params: with(".aux"),
        }
    }
}

/// Word table over the profile database: query word code to every
/// database position whose profile scores that word above the threshold.
#[derive(Debug, Clone)]
pub struct RpsLookup {
    map: Arc<Mmap>,
    word_size: usize,
    num_cells: usize,
    num_positions: usize,
}

impl RpsLookup {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_map(path, map_file(path)?)
    }

    /// Index every word of `profiles` scoring at least `threshold`.
    pub fn build(profiles: &RpsProfiles, word_size: usize, threshold: i32) -> Result<Self> {
        let path = Path::new(IN_MEMORY);
        if !(1..=MAX_RPS_WORD_SIZE).contains(&word_size) {
            return Err(SearchError::InvalidOptions(format!(
                "profile word size {word_size} is outside 1..={MAX_RPS_WORD_SIZE}"
            )));
        }
        let num_cells = BLASTAA_SIZE.pow(word_size as u32);
        let mut cells: Vec<Vec<i32>> = vec![Vec::new(); num_cells];
        let rows = profiles.pssm().rows();
        let mut codes = Vec::new();
        for profile in 0..profiles.num_profiles() {
            let start = profiles.profile_start(profile);
            let len = profiles.profile_length(profile);
            if len < word_size {
                continue;
            }
            for pos in start..=start + len - word_size {
                codes.clear();
                neighborhood(&rows[pos..pos + word_size], threshold, &mut codes);
                let pos = to_int(path, pos, "database position")?;
                for &code in &codes {
                    cells[code as usize].push(pos);
                }
            }
        }

        let num_positions: usize = cells.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity((LOOKUP_HEADER_INTS + num_cells + 1 + num_positions) * INT);
        push_int(&mut bytes, RPS_LOOKUP_MAGIC);
        push_int(&mut bytes, word_size as i32);
        push_int(&mut bytes, BLASTAA_SIZE as i32);
        push_int(&mut bytes, to_int(path, num_cells, "cell count")?);
        let mut offset = 0usize;
        push_int(&mut bytes, 0);
        for cell in &cells {
            offset += cell.len();
            push_int(&mut bytes, to_int(path, offset, "lookup offset")?);
        }
        for &pos in cells.iter().flatten() {
            push_int(&mut bytes, pos);
        }
        log::debug!(
            "built profile lookup: word size {word_size}, threshold {threshold}, {num_positions} positions"
        );
        Self::from_map(path, anonymous_map(&bytes)?)
    }

    fn from_map(path: &Path, map: Mmap) -> Result<Self> {
        check_magic(path, &map, RPS_LOOKUP_MAGIC)?;
        let header = |i: usize| {
            read_int(&map, i).ok_or_else(|| SearchError::malformed(path, "truncated lookup header"))
        };
        let word_size = to_count(path, header(1)?, "word size")?;
        let alphabet = to_count(path, header(2)?, "alphabet size")?;
        let num_cells = to_count(path, header(3)?, "cell count")?;
        if !(1..=MAX_RPS_WORD_SIZE).contains(&word_size) || alphabet != BLASTAA_SIZE {
            return Err(SearchError::malformed(
                path,
                format!("unsupported word size {word_size} over {alphabet} letters"),
            ));
        }
        if num_cells != BLASTAA_SIZE.pow(word_size as u32) {
            return Err(SearchError::malformed(
                path,
                format!("{num_cells} cells for word size {word_size}"),
            ));
        }

        let offset = |i: usize| {
            read_int(&map, LOOKUP_HEADER_INTS + i)
                .ok_or_else(|| SearchError::malformed(path, "truncated lookup offsets"))
        };
        let mut previous = offset(0)?;
        if previous != 0 {
            return Err(SearchError::malformed(path, "first lookup offset is not 0"));
        }
        for i in 1..=num_cells {
            let next = offset(i)?;
            if next < previous {
                return Err(SearchError::malformed(path, format!("lookup offsets decrease at cell {i}")));
            }
            previous = next;
        }
        let num_positions = to_count(path, previous, "position count")?;
        let base = LOOKUP_HEADER_INTS + num_cells + 1;
        if map.len() < (base + num_positions) * INT {
            return Err(SearchError::malformed(
                path,
                format!("{} bytes cannot hold {num_positions} positions", map.len()),
            ));
        }
        if (base..base + num_positions).any(|i| read_int(&map, i).is_some_and(|p| p < 0)) {
            return Err(SearchError::malformed(path, "negative database position"));
        }

        Ok(RpsLookup {
            map: Arc::new(map),
            word_size,
            num_cells,
            num_positions,
        })
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    pub fn num_positions(&self) -> usize {
        self.num_positions
    }

    fn int(&self, index: usize) -> i32 {
        read_int(&self.map, index).unwrap_or(0)
    }

    /// Database positions indexed under `code`.
    pub fn positions(&self, code: usize) -> impl Iterator<Item = usize> + '_ {
        let (start, end) = if code < self.num_cells {
            let header = LOOKUP_HEADER_INTS + code;
            (self.int(header) as usize, self.int(header + 1) as usize)
        } else {
            (0, 0)
        };
        let base = LOOKUP_HEADER_INTS + self.num_cells + 1;
        (base + start..base + end).map(move |i| self.int(i) as usize)
    }

    /// Seeds between every query word and the database positions inside
    /// the window `[window_offset, window_offset + window_len)`.
    pub fn scan(&self, query: &[u8], window_offset: usize, window_len: usize, hits: &mut Vec<WordHit>) {
        let w = self.word_size;
        if query.len() < w || window_len < w {
            return;
        }
        let window_end = window_offset + window_len;
        for q_pos in 0..=query.len() - w {
            let Some(code) = word_code(&query[q_pos..q_pos + w], Alphabet::Protein) else {
                continue;
            };
            hits.extend(
                self.positions(code as usize)
                    .filter(|&p| p >= window_offset && p + w <= window_end)
                    .map(|p| WordHit {
                        q_pos,
                        s_pos: p - window_offset,
                        len: w,
                    }),
            );
        }
    }

    fn byte_len(&self) -> usize {
        (LOOKUP_HEADER_INTS + self.num_cells + 1 + self.num_positions) * INT
    }

    fn bytes(&self) -> &[u8] {
        &self.map[..self.byte_len()]
    }
}

/// Score rows of every profile, laid out over the database pseudo-sequence
/// with one sentinel row between profiles.
#[derive(Debug, Clone)]
pub struct RpsProfiles {
    pssm: Arc<Pssm>,
    starts: Vec<usize>,
    lengths: Vec<usize>,
}

impl RpsProfiles {
    pub fn new(profiles: &[Vec<[i32; BLASTAA_SIZE]>]) -> Self {
        let sentinel_row = [SENTINEL_SCORE; BLASTAA_SIZE];
        let total: usize = profiles.iter().map(Vec::len).sum();
        let mut rows = Vec::with_capacity(total + profiles.len() + 1);
        let mut starts = Vec::with_capacity(profiles.len());
        rows.push(sentinel_row);
        for profile in profiles {
            starts.push(rows.len());
            rows.extend_from_slice(profile);
            rows.push(sentinel_row);
        }
        RpsProfiles {
            pssm: Arc::new(Pssm::new(rows)),
            starts,
            lengths: profiles.iter().map(Vec::len).collect(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let map = map_file(path)?;
        Self::from_bytes(path, &map)
    }

    fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        check_magic(path, bytes, RPS_PSSM_MAGIC)?;
        let int = |i: usize| read_int(bytes, i).ok_or_else(|| SearchError::malformed(path, "truncated PSSM file"));
        let num_profiles = to_count(path, int(1)?, "profile count")?;
        let header_bytes = num_profiles
            .checked_add(PSSM_HEADER_INTS + 1)
            .and_then(|ints| ints.checked_mul(INT));
        if header_bytes.map_or(true, |needed| needed > bytes.len()) {
            return Err(SearchError::malformed(
                path,
                format!("{} bytes cannot hold offsets of {num_profiles} profiles", bytes.len()),
            ));
        }
        let mut offsets = Vec::with_capacity(num_profiles + 1);
        for i in 0..=num_profiles {
            offsets.push(to_count(path, int(PSSM_HEADER_INTS + i)?, "profile offset")?);
        }
        if offsets[0] != 0 || offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(SearchError::malformed(path, "profile offsets are not ascending from 0"));
        }
        let base = PSSM_HEADER_INTS + num_profiles + 1;
        let total = offsets[num_profiles];
        if bytes.len() < (base + total * BLASTAA_SIZE) * INT {
            return Err(SearchError::malformed(
                path,
                format!("{} bytes cannot hold {total} score rows", bytes.len()),
            ));
        }
        let profiles: Vec<Vec<[i32; BLASTAA_SIZE]>> = offsets
            .windows(2)
            .map(|w| {
                (w[0]..w[1])
                    .map(|row| {
                        let mut scores = [0i32; BLASTAA_SIZE];
                        for (r, cell) in scores.iter_mut().enumerate() {
                            *cell = read_int(bytes, base + row * BLASTAA_SIZE + r).unwrap_or(SENTINEL_SCORE);
                        }
                        scores
                    })
                    .collect()
            })
            .collect();
        log::debug!("loaded {num_profiles} profiles, {total} positions from {}", path.display());
        Ok(Self::new(&profiles))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let path = Path::new(IN_MEMORY);
        let total: usize = self.lengths.iter().sum();
        let mut bytes = Vec::with_capacity((PSSM_HEADER_INTS + self.lengths.len() + 1 + total * BLASTAA_SIZE) * INT);
        push_int(&mut bytes, RPS_PSSM_MAGIC);
        push_int(&mut bytes, to_int(path, self.num_profiles(), "profile count")?);
        let mut offset = 0;
        push_int(&mut bytes, 0);
        for &len in &self.lengths {
            offset += len;
            push_int(&mut bytes, to_int(path, offset, "profile offset")?);
        }
        for (&start, &len) in self.starts.iter().zip(&self.lengths) {
            for row in &self.pssm.rows()[start..start + len] {
                for &score in row {
                    push_int(&mut bytes, score);
                }
            }
        }
        Ok(bytes)
    }

    pub fn num_profiles(&self) -> usize {
        self.starts.len()
    }

    pub fn pssm(&self) -> &Arc<Pssm> {
        &self.pssm
    }

    /// Database position of the first row of `profile`.
    pub fn profile_start(&self, profile: usize) -> usize {
        self.starts[profile]
    }

    pub fn profile_length(&self, profile: usize) -> usize {
        self.lengths[profile]
    }

    /// Total profile positions, sentinels excluded.
    pub fn total_length(&self) -> u64 {
        self.lengths.iter().map(|&l| l as u64).sum()
    }

    /// Pseudo-sequence scanned in place of a subject: `X` over profile
    /// positions, sentinels between them.
    pub fn db_sequence(&self) -> Vec<u8> {
        let mut seq = vec![PROTEIN_SENTINEL; self.pssm.len()];
        for (&start, &len) in self.starts.iter().zip(&self.lengths) {
            seq[start..start + len].fill(NCBISTDAA_X);
        }
        seq
    }

    /// Profile holding database position `pos` and the offset inside it.
    pub fn locate(&self, pos: usize) -> Option<(usize, usize)> {
        let profile = self.starts.partition_point(|&s| s <= pos).checked_sub(1)?;
        let offset = pos - self.starts[profile];
        (offset < self.lengths[profile]).then_some((profile, offset))
    }
}

/// Contents of the text parameters file.
#[derive(Debug, Clone, PartialEq)]
pub struct RpsParams {
    pub matrix_name: String,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub ungapped_k: f64,
    pub ungapped_h: f64,
    pub max_db_seq_length: usize,
    pub db_length: u64,
    pub scale_factor: f64,
    /// Karlin K of every profile.
    pub karlin_k: Vec<f64>,
}

impl RpsParams {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let mut next = |what: &str| {
            tokens
                .next()
                .ok_or_else(|| SearchError::malformed(path, format!("parameters end before {what}")))
        };
        fn number<T: std::str::FromStr>(path: &Path, token: &str, what: &str) -> Result<T> {
            token
                .parse()
                .map_err(|_| SearchError::malformed(path, format!("bad {what} {token:?}")))
        }

        let matrix_name = next("matrix name")?.to_string();
        let gap_open = number(path, next("gap open")?, "gap open")?;
        let gap_extend = number(path, next("gap extend")?, "gap extend")?;
        let ungapped_k = number(path, next("ungapped K")?, "ungapped K")?;
        let ungapped_h = number(path, next("ungapped H")?, "ungapped H")?;
        let max_db_seq_length = number(path, next("max sequence length")?, "max sequence length")?;
        let db_length = number(path, next("database length")?, "database length")?;
        let scale_factor: f64 = number(path, next("scale factor")?, "scale factor")?;
        if !(scale_factor > 0.0) {
            return Err(SearchError::malformed(path, format!("scale factor {scale_factor} is not positive")));
        }

        let rest: Vec<&str> = tokens.collect();
        if rest.len() % 2 != 0 {
            return Err(SearchError::malformed(path, "truncated profile parameters"));
        }
        let karlin_k = rest
            .chunks_exact(2)
            .map(|pair| {
                number::<i64>(path, pair[0], "profile field")?;
                number::<f64>(path, pair[1], "profile K")
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RpsParams {
            matrix_name,
            gap_open,
            gap_extend,
            ungapped_k,
            ungapped_h,
            max_db_seq_length,
            db_length,
            scale_factor,
            karlin_k,
        })
    }

    pub fn to_text(&self) -> String {
        let mut text = format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
            self.matrix_name,
            self.gap_open,
            self.gap_extend,
            self.ungapped_k,
            self.ungapped_h,
            self.max_db_seq_length,
            self.db_length,
            self.scale_factor
        );
        for k in &self.karlin_k {
            text.push_str(&format!("0 {k}\n"));
        }
        text
    }
}

/// A loaded profile database.
#[derive(Debug, Clone)]
pub struct RpsDatabase {
    lookup: RpsLookup,
    profiles: RpsProfiles,
    params: RpsParams,
}

impl RpsDatabase {
    /// Open `<base>.loo`, `<base>.rps` and `<base>.aux`.
    pub fn open(base: &Path) -> Result<Self> {
        let paths = RpsPaths::new(base);
        let lookup = RpsLookup::open(&paths.lookup)?;
        let profiles = RpsProfiles::open(&paths.pssm)?;
        let params = RpsParams::read(&paths.params)?;
        if params.karlin_k.len() != profiles.num_profiles() {
            return Err(SearchError::malformed(
                &paths.params,
                format!(
                    "{} profile entries for {} profiles",
                    params.karlin_k.len(),
                    profiles.num_profiles()
                ),
            ));
        }
        Self::from_parts(lookup, profiles, params)
    }

    /// Build a database in memory from score rows.
    pub fn build(
        profiles: &[Vec<[i32; BLASTAA_SIZE]>],
        params: RpsParams,
        word_size: usize,
        threshold: i32,
    ) -> Result<Self> {
        let profiles = RpsProfiles::new(profiles);
        let lookup = RpsLookup::build(&profiles, word_size, threshold)?;
        Self::from_parts(lookup, profiles, params)
    }

    fn from_parts(lookup: RpsLookup, profiles: RpsProfiles, params: RpsParams) -> Result<Self> {
        if params.karlin_k.len() != profiles.num_profiles() {
            return Err(SearchError::InvalidOptions(format!(
                "{} profile K values for {} profiles",
                params.karlin_k.len(),
                profiles.num_profiles()
            )));
        }
        Ok(RpsDatabase {
            lookup,
            profiles,
            params,
        })
    }

    /// Write the three files next to `base`.
    pub fn write(&self, base: &Path) -> Result<RpsPaths> {
        let paths = RpsPaths::new(base);
        File::create(&paths.lookup)?.write_all(self.lookup.bytes())?;
        File::create(&paths.pssm)?.write_all(&self.profiles.to_bytes()?)?;
        std::fs::write(&paths.params, self.params.to_text())?;
        Ok(paths)
    }

    pub fn lookup(&self) -> &RpsLookup {
        &self.lookup
    }

    pub fn profiles(&self) -> &RpsProfiles {
        &self.profiles
    }

    pub fn params(&self) -> &RpsParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blast_encoding::{aminoacid_to_ncbistdaa, encode_protein};

    /// One row per residue of `seq`, scoring 5 for that residue and -1
    /// otherwise.
    fn identity_profile(seq: &[u8]) -> Vec<[i32; BLASTAA_SIZE]> {
        encode_protein(seq)
            .into_iter()
            .map(|r| {
                let mut row = [-1; BLASTAA_SIZE];
                row[r as usize] = 5;
                row
            })
            .collect()
    }

    fn params(n: usize) -> RpsParams {
        RpsParams {
            matrix_name: "BLOSUM62".to_string(),
            gap_open: 11,
            gap_extend: 1,
            ungapped_k: 0.13,
            ungapped_h: 0.4,
            max_db_seq_length: 10,
            db_length: 20,
            scale_factor: 1.0,
            karlin_k: vec![0.1; n],
        }
    }

    #[test]
    fn test_profile_layout() {
        let profiles = RpsProfiles::new(&[identity_profile(b"MKV"), identity_profile(b"WWAC")]);
        assert_eq!(profiles.profile_start(0), 1);
        assert_eq!(profiles.profile_start(1), 5);
        assert_eq!(profiles.db_sequence(), vec![0, 21, 21, 21, 0, 21, 21, 21, 21, 0]);
        assert_eq!(profiles.locate(6), Some((1, 1)));
        assert_eq!(profiles.locate(4), None);
        let m = aminoacid_to_ncbistdaa(b'M');
        assert_eq!(profiles.pssm().score(1, m), 5);
        assert_eq!(profiles.pssm().score(4, m), SENTINEL_SCORE);
    }

    #[test]
    fn test_lookup_finds_profile_words() {
        let db = RpsDatabase::build(&[identity_profile(b"MKVL"), identity_profile(b"WWAC")], params(2), 3, 15).unwrap();
        let mut hits = Vec::new();
        let mut query = vec![PROTEIN_SENTINEL];
        query.extend(encode_protein(b"WWA"));
        query.push(PROTEIN_SENTINEL);
        db.lookup().scan(&query, 0, 11, &mut hits);
        assert_eq!(hits, vec![WordHit { q_pos: 1, s_pos: 6, len: 3 }]);

        hits.clear();
        db.lookup().scan(&query, 3, 5, &mut hits);
        assert!(hits.is_empty());
        hits.clear();
        db.lookup().scan(&query, 4, 5, &mut hits);
        assert_eq!(hits, vec![WordHit { q_pos: 1, s_pos: 2, len: 3 }]);
    }

    #[test]
    fn test_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("tiny");
        let db = RpsDatabase::build(&[identity_profile(b"MKVL"), identity_profile(b"WWAC")], params(2), 3, 15).unwrap();
        db.write(&base).unwrap();
        let loaded = RpsDatabase::open(&base).unwrap();
        assert_eq!(loaded.params(), db.params());
        assert_eq!(loaded.lookup().num_positions(), db.lookup().num_positions());
        assert_eq!(loaded.profiles().pssm().rows(), db.profiles().pssm().rows());
    }

    #[test]
    fn test_swapped_magic_is_incompatible_platform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.rps");
        let mut bytes = RPS_PSSM_MAGIC.swap_bytes().to_ne_bytes().to_vec();
        bytes.extend_from_slice(&0i32.to_ne_bytes());
        std::fs::write(&path, &bytes).unwrap();
        let err = RpsProfiles::open(&path).unwrap_err();
        assert!(matches!(err, SearchError::IncompatiblePlatform { .. }));

        std::fs::write(&path, 1234i32.to_ne_bytes()).unwrap();
        let err = RpsProfiles::open(&path).unwrap_err();
        assert!(matches!(err, SearchError::MalformedRpsFile { .. }));
    }

    #[test]
    fn test_oversized_profile_count_is_malformed() {
        let mut bytes = RPS_PSSM_MAGIC.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&i32::MAX.to_ne_bytes());
        bytes.extend_from_slice(&0i32.to_ne_bytes());
        let err = RpsProfiles::from_bytes(Path::new("huge.rps"), &bytes).unwrap_err();
        assert!(matches!(err, SearchError::MalformedRpsFile { .. }));
    }

    #[test]
    fn test_truncated_params() {
        let path = Path::new("db.aux");
        let full = params(2).to_text();
        assert_eq!(RpsParams::parse(path, &full).unwrap(), params(2));
        let err = RpsParams::parse(path, "BLOSUM62 11 1 0.13").unwrap_err();
        assert!(matches!(err, SearchError::MalformedRpsFile { .. }));
        let err = RpsParams::parse(path, &format!("{full} 7")).unwrap_err();
        assert!(matches!(err, SearchError::MalformedRpsFile { .. }));
    }
}
