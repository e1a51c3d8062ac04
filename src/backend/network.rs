//! Backend network profile and entity matchers.
//!
//! # Responsibilities
//! - Parse the YAML network profile (channels, organizations, peers)
//! - Parse the entity matcher file (regex rewrites of peer endpoints)
//! - Resolve the peer endpoint a given channel/org/user should talk to
//!
//! # Design Decisions
//! - A missing matcher file means "no rewrites", a missing profile is an error
//! - First matching matcher wins, in file order
//! - Peers are tried in the organization's declared order

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::backend::BackendError;

/// Network profile: who is on which channel and where they listen.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkProfile {
    pub name: String,
    pub channels: BTreeMap<String, ChannelProfile>,
    pub organizations: BTreeMap<String, OrganizationProfile>,
    pub peers: HashMap<String, PeerProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelProfile {
    /// Peers joined to the channel, keyed by peer name.
    pub peers: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrganizationProfile {
    #[serde(rename = "mspid")]
    pub msp_id: String,
    pub peers: Vec<String>,
    /// Principals allowed to transact; empty means unrestricted.
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerProfile {
    pub url: String,
}

/// One endpoint rewrite rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatcherRule {
    pattern: String,
    url_substitution_exp: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MatcherFile {
    entity_matchers: MatcherSections,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MatcherSections {
    peer: Vec<MatcherRule>,
}

/// Compiled peer endpoint rewrites.
#[derive(Debug, Clone, Default)]
pub struct EntityMatchers {
    peer: Vec<(Regex, String)>,
}

impl EntityMatchers {
    /// Load matchers from a YAML file. A missing file yields no matchers.
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Entity matcher file not found, using profile URLs as-is");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| BackendError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, BackendError> {
        let file: MatcherFile = serde_yaml::from_str(content)
            .map_err(|e| BackendError::Config(format!("invalid entity matchers: {}", e)))?;
        let peer = file
            .entity_matchers
            .peer
            .into_iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.url_substitution_exp))
                    .map_err(|e| BackendError::Config(format!("bad matcher pattern '{}': {}", rule.pattern, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { peer })
    }

    /// Rewritten URL for `peer`, if any matcher applies.
    pub fn peer_url(&self, peer: &str) -> Option<String> {
        self.peer
            .iter()
            .find(|(re, _)| re.is_match(peer))
            .map(|(re, exp)| re.replace(peer, exp.as_str()).into_owned())
    }

    pub fn len(&self) -> usize {
        self.peer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peer.is_empty()
    }
}

/// The peer a session should be opened against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEndpoint {
    pub name: String,
    pub url: Url,
    pub msp_id: String,
}

impl NetworkProfile {
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let content = fs::read_to_string(path)
            .map_err(|e| BackendError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, BackendError> {
        serde_yaml::from_str(content).map_err(|e| BackendError::Config(format!("invalid network profile: {}", e)))
    }

    /// Pick the first peer of `org` joined to `channel`.
    pub fn resolve(
        &self,
        channel: &str,
        org: &str,
        user: &str,
        matchers: &EntityMatchers,
    ) -> Result<PeerEndpoint, BackendError> {
        let channel_profile = self
            .channels
            .get(channel)
            .ok_or_else(|| BackendError::Config(format!("channel '{}' not in network profile", channel)))?;
        let org_profile = self
            .organizations
            .get(org)
            .ok_or_else(|| BackendError::Config(format!("organization '{}' not in network profile", org)))?;

        if !org_profile.users.is_empty() && !org_profile.users.iter().any(|u| u == user) {
            return Err(BackendError::Config(format!(
                "user '{}' is not registered with organization '{}'",
                user, org
            )));
        }

        let name = org_profile
            .peers
            .iter()
            .find(|peer| channel_profile.peers.contains_key(peer.as_str()))
            .ok_or_else(|| {
                BackendError::Config(format!("organization '{}' has no peer on channel '{}'", org, channel))
            })?;

        let raw_url = match matchers.peer_url(name) {
            Some(url) => url,
            None => self
                .peers
                .get(name)
                .map(|p| p.url.clone())
                .ok_or_else(|| BackendError::Config(format!("peer '{}' has no url", name)))?,
        };
        let url = Url::parse(&raw_url)
            .map_err(|e| BackendError::Config(format!("peer '{}' url '{}': {}", name, raw_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BackendError::Config(format!(
                "peer '{}' url '{}' must use http or https",
                name, raw_url
            )));
        }

        Ok(PeerEndpoint {
            name: name.clone(),
            url,
            msp_id: org_profile.msp_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
name: byfn
channels:
  mychannel:
    peers:
      peer0.org1.example.com: {}
      peer0.org2.example.com: {}
organizations:
  org1:
    mspid: Org1MSP
    peers: [peer1.org1.example.com, peer0.org1.example.com]
    users: [Admin, User1]
  org2:
    mspid: Org2MSP
    peers: [peer0.org2.example.com]
peers:
  peer0.org1.example.com:
    url: http://peer0.org1.example.com:7051
  peer0.org2.example.com:
    url: grpcs://peer0.org2.example.com:9051
"#;

    const MATCHERS: &str = r#"
entityMatchers:
  peer:
    - pattern: ^peer(\d+)\.org2\.example\.com$
      urlSubstitutionExp: http://localhost:905${1}
"#;

    #[test]
    fn resolves_first_org_peer_on_channel() {
        let profile = NetworkProfile::from_yaml(PROFILE).unwrap();
        let peer = profile
            .resolve("mychannel", "org1", "Admin", &EntityMatchers::default())
            .unwrap();
        assert_eq!(peer.name, "peer0.org1.example.com");
        assert_eq!(peer.url.as_str(), "http://peer0.org1.example.com:7051/");
        assert_eq!(peer.msp_id, "Org1MSP");
    }

    #[test]
    fn matcher_rewrites_peer_url() {
        let profile = NetworkProfile::from_yaml(PROFILE).unwrap();
        let matchers = EntityMatchers::from_yaml(MATCHERS).unwrap();
        assert_eq!(matchers.len(), 1);
        let peer = profile.resolve("mychannel", "org2", "anyone", &matchers).unwrap();
        assert_eq!(peer.url.as_str(), "http://localhost:9050/");
    }

    #[test]
    fn non_http_peer_url_rejected() {
        let profile = NetworkProfile::from_yaml(PROFILE).unwrap();
        let err = profile
            .resolve("mychannel", "org2", "Admin", &EntityMatchers::default())
            .unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn unknown_names_rejected() {
        let profile = NetworkProfile::from_yaml(PROFILE).unwrap();
        let none = EntityMatchers::default();
        assert!(profile.resolve("other", "org1", "Admin", &none).is_err());
        assert!(profile.resolve("mychannel", "org9", "Admin", &none).is_err());
        assert!(profile.resolve("mychannel", "org1", "Mallory", &none).is_err());
    }

    #[test]
    fn missing_matcher_file_is_empty() {
        let matchers = EntityMatchers::load(Path::new("/nonexistent/matchers.yaml")).unwrap();
        assert!(matchers.is_empty());
    }

    #[test]
    fn bad_matcher_pattern_is_config_error() {
        let yaml = "entityMatchers:\n  peer:\n    - pattern: '('\n      urlSubstitutionExp: x\n";
        assert!(matches!(EntityMatchers::from_yaml(yaml), Err(BackendError::Config(_))));
    }
}
