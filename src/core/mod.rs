//! Search engine core.
//!
//! - **Setup** (`blast_program`, `blast_options`, `query_info`, `blast_stat`)
//!   - Program model, option bundles and validation
//!   - Query block layout and context table
//!   - Scoring matrices, profiles, Karlin-Altschul blocks
//!
//! - **Seeds and extension** (`blast_lookup`, `blast_extend`, `phi_pattern`)
//!   - Lookup tables over the query (or the profile database)
//!   - Two-hit ungapped extension into initial hits
//!
//! - **HSP management** (`blast_hits`, `blast_hitlist`, `blast_results`, `link_hsps`, `reevaluate`)
//!   - Bounded HSP lists, chunk merging, reaping
//!   - Per-query hit lists and the result container
//!   - E-values and sum-statistics linking
//!
//! - **Driving a search** (`blast_engine`, `blast_rps`, `hsp_stream`, `seq_src`, `rps_files`)
//!   - Chunk and frame loops, worker loop, cancellation
//!   - Profile database search
//!   - Worker-to-reader channel and subject sources

// Setup
pub mod blast_options;
pub mod blast_program;
pub mod blast_stat;
pub mod query_info;

// Utilities
pub mod blast_encoding;
pub mod gencode_singleton;

// Seeds and extension
pub mod blast_extend;
pub mod blast_gapalign;
pub mod blast_lookup;
pub mod phi_pattern;

// HSP management
pub mod blast_hitlist;
pub mod blast_hits;
pub mod blast_results;
pub mod link_hsps;
pub mod reevaluate;

// Driving a search
pub mod blast_diagnostics;
pub mod blast_engine;
pub mod blast_rps;
pub mod hsp_stream;
pub mod rps_files;
pub mod seq_src;
