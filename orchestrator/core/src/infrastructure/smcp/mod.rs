// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod attestation;
pub mod envelope;
pub mod middleware;
pub mod policy_engine;
pub mod signature;
pub mod audit;

pub use attestation::{AttestationRequest, AttestationResponse, AttestationService};
pub use envelope::{SmcpEnvelope, ContextClaims, AudienceClaim};
pub use middleware::SmcpMiddleware;
pub use policy_engine::PolicyEngine;
