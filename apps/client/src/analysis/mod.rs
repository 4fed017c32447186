// Analysis: score normalization, the normalized report, and the session that
// owns the selected résumé / job description pair.

pub mod normalizer;
pub mod report;
pub mod session;
