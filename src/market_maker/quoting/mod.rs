//! Quote ladder generation.

mod quoter;

pub use quoter::{EnhancedQuoter, Quote, QuoteDiagnostics, QuoteInputs, QuoteSet, QuoterConfig};
