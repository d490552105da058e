pub mod cigar;
pub mod dna;
