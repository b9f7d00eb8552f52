//! On-chain payment verification.

pub mod verifier;

pub use verifier::{PaymentVerifier, VerificationResult, VerifyRequest, to_wei};
