// Common types used across multiple domains and layers
//
// These types are shared between the kernel and domain layers to avoid
// circular dependencies while maintaining type safety.

use serde::{Deserialize, Serialize};

/// Which part of the user population a registry scan returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipFilter {
    All,
    Members,
    NonMembers,
}

impl MembershipFilter {
    /// Whether a user with the given stored membership flag passes the filter.
    pub fn matches(self, is_member: bool) -> bool {
        match self {
            MembershipFilter::All => true,
            MembershipFilter::Members => is_member,
            MembershipFilter::NonMembers => !is_member,
        }
    }
}

/// Registry head-counts for the admin overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipCounts {
    pub total: u64,
    pub members: u64,
    pub non_members: u64,
}

/// Upload/download byte counters reported by the provisioner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub upload_bytes: u64,
    pub download_bytes: u64,
}

impl TrafficStats {
    pub fn upload_human(&self) -> String {
        format_bytes(self.upload_bytes)
    }

    pub fn download_human(&self) -> String {
        format_bytes(self.download_bytes)
    }
}

/// Render a byte count as megabytes, or gigabytes from 1024 MB upwards.
pub fn format_bytes(bytes: u64) -> String {
    let megabytes = bytes as f64 / 1024.0 / 1024.0;
    if megabytes < 1024.0 {
        format!("{:.2} MB", megabytes)
    } else {
        format!("{:.2} GB", megabytes / 1024.0)
    }
}
