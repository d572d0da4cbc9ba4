//! Program types and their alphabet/frame properties.

use clap::ValueEnum;

/// All six translation frames in the order they are searched.
pub const SIX_FRAMES: [i8; 6] = [1, 2, 3, -1, -2, -3];
/// Both nucleotide strands.
pub const TWO_STRANDS: [i8; 2] = [1, -1];
/// Frame value used for untranslated protein sequences.
pub const NO_FRAME: [i8; 1] = [0];
/// Frame value used for the plus strand of a nucleotide sequence.
pub const PLUS_STRAND: [i8; 1] = [1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ProgramType {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
    Tblastx,
    #[value(name = "rpsblast")]
    RpsBlast,
    #[value(name = "rpstblastn")]
    RpsTblastn,
    #[value(name = "phiblastp")]
    PhiBlastp,
    #[value(name = "phiblastn")]
    PhiBlastn,
}

impl ProgramType {
    pub fn name(self) -> &'static str {
        match self {
            ProgramType::Blastn => "blastn",
            ProgramType::Blastp => "blastp",
            ProgramType::Blastx => "blastx",
            ProgramType::Tblastn => "tblastn",
            ProgramType::Tblastx => "tblastx",
            ProgramType::RpsBlast => "rpsblast",
            ProgramType::RpsTblastn => "rpstblastn",
            ProgramType::PhiBlastp => "phiblastp",
            ProgramType::PhiBlastn => "phiblastn",
        }
    }

    /// Caller-supplied queries are nucleotide.
    pub fn query_is_nucleotide(self) -> bool {
        matches!(
            self,
            ProgramType::Blastn
                | ProgramType::Blastx
                | ProgramType::Tblastx
                | ProgramType::RpsTblastn
                | ProgramType::PhiBlastn
        )
    }

    pub fn query_is_translated(self) -> bool {
        matches!(
            self,
            ProgramType::Blastx | ProgramType::Tblastx | ProgramType::RpsTblastn
        )
    }

    /// Database sequences are nucleotide.
    pub fn subject_is_nucleotide(self) -> bool {
        matches!(
            self,
            ProgramType::Blastn
                | ProgramType::Tblastn
                | ProgramType::Tblastx
                | ProgramType::PhiBlastn
        )
    }

    /// Database sequences are translated in six frames.
    pub fn subject_is_translated(self) -> bool {
        matches!(self, ProgramType::Tblastn | ProgramType::Tblastx)
    }

    pub fn is_rps(self) -> bool {
        matches!(self, ProgramType::RpsBlast | ProgramType::RpsTblastn)
    }

    pub fn is_phi(self) -> bool {
        matches!(self, ProgramType::PhiBlastp | ProgramType::PhiBlastn)
    }

    /// Alignment scoring happens on nucleotide residues.
    pub fn is_nucleotide_search(self) -> bool {
        matches!(self, ProgramType::Blastn | ProgramType::PhiBlastn)
    }

    /// Frames each caller query expands into.
    pub fn query_frames(self) -> &'static [i8] {
        if self.query_is_translated() {
            &SIX_FRAMES
        } else if self.query_is_nucleotide() {
            &TWO_STRANDS
        } else {
            &NO_FRAME
        }
    }

    pub fn contexts_per_query(self) -> usize {
        self.query_frames().len()
    }

    /// Frames iterated for every subject sequence.
    ///
    /// Nucleotide strands are carried by the query contexts, so blastn scans
    /// the subject once on its plus strand.
    pub fn subject_frames(self) -> &'static [i8] {
        if self.subject_is_translated() {
            &SIX_FRAMES
        } else if self.subject_is_nucleotide() {
            &PLUS_STRAND
        } else {
            &NO_FRAME
        }
    }
}

impl std::fmt::Display for ProgramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_counts() {
        assert_eq!(ProgramType::Blastp.subject_frames().len(), 1);
        assert_eq!(ProgramType::Blastn.contexts_per_query(), 2);
        assert_eq!(ProgramType::Blastn.subject_frames(), &[1]);
        assert_eq!(ProgramType::Tblastx.subject_frames().len(), 6);
        assert_eq!(ProgramType::Tblastx.contexts_per_query(), 6);
        assert_eq!(ProgramType::Blastx.subject_frames(), &[0]);
        assert_eq!(ProgramType::RpsTblastn.contexts_per_query(), 6);
        assert_eq!(ProgramType::RpsTblastn.subject_frames(), &[0]);
    }

    #[test]
    fn test_program_kinds() {
        assert!(ProgramType::RpsBlast.is_rps());
        assert!(!ProgramType::Blastp.is_rps());
        assert!(ProgramType::PhiBlastp.is_phi());
        assert!(ProgramType::Blastn.is_nucleotide_search());
        assert!(!ProgramType::Tblastn.is_nucleotide_search());
    }
}
