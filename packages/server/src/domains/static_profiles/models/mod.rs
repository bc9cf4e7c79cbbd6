pub mod static_profile;

pub use static_profile::StaticProfile;
