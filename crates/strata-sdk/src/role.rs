// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Launch roles.

use std::str::FromStr;
use strata_core::Affinity;

/// What this process is launched as. Decides which kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// A player-facing process: platform, simulation, and rendering.
    #[default]
    Client,
    /// A headless simulation process.
    Server,
    /// A client that also hosts the simulation.
    Both,
}

/// Returned by [`Role::from_str`] for an unknown token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`, expected client, server, dedicated, both or host")]
pub struct UnknownRole(pub String);

impl Role {
    /// The affinities that get a kernel under this role.
    pub fn affinities(self) -> Affinity {
        match self {
            Role::Server => Affinity::GAME,
            Role::Client | Role::Both => Affinity::ALL,
        }
    }

    /// Parses a launch token, falling back to [`Role::Client`] with a warning.
    ///
    /// ```
    /// use strata_sdk::Role;
    ///
    /// assert_eq!(Role::parse_lenient("dedicated"), Role::Server);
    /// assert_eq!(Role::parse_lenient("spectator"), Role::Client);
    /// ```
    pub fn parse_lenient(token: &str) -> Role {
        token.parse().unwrap_or_else(|error: UnknownRole| {
            log::warn!("{error}; falling back to {}", Role::default());
            Role::default()
        })
    }

    /// The canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
            Role::Both => "both",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "server" | "dedicated" => Ok(Role::Server),
            "both" | "host" => Ok(Role::Both),
            _ => Err(UnknownRole(token.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!("server".parse::<Role>(), Ok(Role::Server));
        assert_eq!("Dedicated".parse::<Role>(), Ok(Role::Server));
        assert_eq!("host".parse::<Role>(), Ok(Role::Both));
        assert_eq!(" both ".parse::<Role>(), Ok(Role::Both));
        assert_eq!("client".parse::<Role>(), Ok(Role::Client));
        assert!("observer".parse::<Role>().is_err());
    }

    #[test]
    fn test_affinity_sets() {
        assert_eq!(Role::Server.affinities(), Affinity::GAME);
        assert_eq!(Role::Client.affinities(), Affinity::ALL);
        assert_eq!(Role::Both.affinities(), Affinity::ALL);
    }

    #[test]
    fn test_unknown_token_falls_back_to_client() {
        assert_eq!(Role::parse_lenient(""), Role::Client);
        assert_eq!(Role::parse_lenient("both"), Role::Both);
    }
}
