// Tests module
// Scenarios: orders crossing the curve, dust expiry, multisig voting
// Invariants: K, check/commit isolation, nonces, routes, payload codec
// Pipeline: failure fee, protocol versions, commission coins

pub mod support;
pub mod scenarios;
