// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// Roles form a strict ladder; each rank holds every privilege below it.
///
/// - `Admin` - Full access, including elevated operations
/// - `User` - Normal authenticated user
/// - `Public` - Unauthenticated caller (also the fallback for unknown
///   role strings coming from upstream metadata)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unauthenticated or unrecognized
    Public,
    /// Normal authenticated user
    User,
    /// Full administrative access
    Admin,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Position on the ladder. Higher rank implies every lower privilege.
    fn rank(&self) -> u8 {
        match self {
            Role::Public => 0,
            Role::User => 1,
            Role::Admin => 2,
        }
    }

    /// Parse role from string (case-insensitive).
    /// Used when reading roles out of upstream app metadata.
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "public" => Some(Role::Public),
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is Public (no privileges until proven otherwise).
    fn default() -> Self {
        Role::Public
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Public => write!(f, "public"),
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}
