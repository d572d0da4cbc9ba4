//! Integration tests for hspsearch, one module per area:
//! - `hits` - HSP list, hit list and result container properties
//! - `search` - chunking, interruption and thread-count behaviour of full searches
//! - `gapped` - gapped searches through a plugged-in aligner
//! - `translated` - translated subjects and queries, including profile search
//! - `rps` - profile database files and profile searches

mod gapped;
mod helpers;
mod hits;
mod rps;
mod search;
mod translated;
