// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Smcp
//!
//! Provides smcp functionality for the system.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements smcp
//! - **Related ADRs:** ADR-035: SMCP Implementation

// ============================================================================
// ADR-035: SMCP (Secure Model Context Protocol) Implementation
// ============================================================================
// Purpose: Cryptographically secure MCP with signed envelopes and bounded authorization
// Current Status: Not implemented - Phase 1 uses unsigned MCP only
// 
// Phase 1 Gap:
// - No cryptographic signing of tool calls
// - No bounded SecurityContext for fine-grained tool permissions
// - No ContextToken JWT with agent identity proof
// - Agents could theoretically forge tool requests
//
// Phase 4 Implementation: Cryptographically signed MCP envelopes
// 1. Attestation: Agent proves identity via Ed25519 ephemeral keypair
// 2. ContextToken: JWT signed by Orchestrator proving SecurityContext assignment
// 3. SmcpEnvelope: Outer wrapper with signature + inner MCP message
// 4. PolicyEngine: Cedar-based rule evaluator for tool capability checks
// 5. Non-Repudiation: Cryptographic proof of agent's tool invocation
//
// Security Properties:
// - Agent cannot forge tool requests (signature verification)
// - Agent cannot escalate to unauthorized tools (SecurityContext bounded)
// - Orchestrator cannot misattribute tool calls (Ed25519 ephemeral key)
// - Full audit trail with cryptographic proof (immutable)
//
// See: adrs/035-smcp-implementation.md
// ============================================================================

use serde::{Deserialize, Serialize};

/// SMCP Envelope for cryptographically signed MCP messages
/// TODO: ADR-035 implementation for Phase 4
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmcpEnvelope {
    /// Context token proving agent identity and SecurityContext
    pub context_token: String,
    /// Ed25519 signature of inner MCP message
    pub signature: String,
    /// Inner MCP message (opaque to SMCP layer)
    pub inner_mcp: Vec<u8>,
}

/// ContextToken JWT payload with agent identity and security context
/// TODO: Issued by Orchestrator during attestation phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextToken {
    /// Agent identifier
    pub agent_id: String,
    /// Execution identifier
    pub execution_id: String,
    /// Assigned SecurityContext name
    pub security_context: String,
    /// Token issued at (Unix timestamp)
    pub iat: i64,
    /// Token expiry (Unix timestamp)
    pub exp: i64,
}

/// SecurityContext: Named permission boundary for tool capabilities
/// TODO: Replaces static manifests; enables fine-grained, dynamic tool policies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityContext {
    /// Human-readable name (e.g., "research-safe", "filesystem-only")
    pub name: String,
    /// List of tool capabilities and constraints
    pub capabilities: Vec<ToolCapability>,
}

/// Fine-grained tool permission with constraints
/// TODO: Defines what tools are allowed and under what conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCapability {
    /// Tool name pattern (e.g., "filesystem/*" matches all filesystem tools)
    pub tool_pattern: String,
    /// Allowed operation (e.g., "read", "write", "execute")
    pub operation: String,
    /// Path allowlist (e.g., ["/workspace/**", "/tmp/*"])
    pub path_allowlist: Vec<String>,
    /// Rate limit (calls per second)
    pub rate_limit: Option<f64>,
}

/// SmcpMiddleware: Verifies and unwraps SMCP envelopes
/// TODO: Runs on orchestrator before forwarding to MCP server
pub struct SmcpMiddleware {
    // TODO: Public key registry for Ed25519 verification
}

impl SmcpMiddleware {
    pub fn new() -> Self {
        todo!("ADR-035: SMCP middleware not yet implemented")
    }

    /// Verify SMCP envelope signature and extract inner MCP message
    pub async fn verify_and_unwrap(&self, envelope: &SmcpEnvelope) -> Result<Vec<u8>, String> {
        // TODO: Implement Ed25519 signature verification
        // TODO: Validate ContextToken JWT (signature, expiry, issuer)
        // TODO: Check agent's SecurityContext against tool call
        // TODO: Publish audit event on success/violation
        todo!("ADR-035: Envelope verification not implemented")
    }
}

/// Attestation: Agent proves identity and receives ContextToken
/// TODO: One-time handshake per execution
pub struct AttestationService {
    // TODO: Root signing key (from OpenBao)
}

impl AttestationService {
    pub fn new() -> Self {
        todo!("ADR-035: Attestation service not yet implemented")
    }

    /// Agent presents ephemeral Ed25519 public key + container ID
    /// Returns ContextToken signed by orchestrator
    pub async fn attest(&self, public_key: &str, container_id: &str) -> Result<String, String> {
        // TODO: Validate container ID matches registered execution
        // TODO: Lookup SecurityContext for execution
        // TODO: Issue ContextToken JWT (signed by Orchestrator root key)
        // TODO: Return token to agent
        todo!("ADR-035: Attestation not implemented")
    }
}

use anyhow::Result;
