//! Session names for assumed-role sessions
//!
//! Only used as the CloudTrail audit label, never for identity.

use rand::RngCore;
use rand::rngs::OsRng;

pub const SESSION_PREFIX: &str = "terraform-";

/// Session name used by the dual-mode provider when none is configured
pub const DEFAULT_SESSION_NAME: &str = "terraform-provider-session";

/// `terraform-` followed by 8 random bytes in hex.
///
/// Falls back to `terraform-session-<pid>` when the OS RNG is unavailable.
pub fn random_session_name() -> String {
    session_name_from(&mut OsRng)
}

fn session_name_from<R: RngCore>(rng: &mut R) -> String {
    let mut bytes = [0u8; 8];
    match rng.try_fill_bytes(&mut bytes) {
        Ok(()) => format!("{}{}", SESSION_PREFIX, hex::encode(bytes)),
        Err(e) => {
            tracing::warn!(error = %e, "random source unavailable, using pid session name");
            fallback_session_name()
        }
    }
}

fn fallback_session_name() -> String {
    format!("{}session-{}", SESSION_PREFIX, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {}
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    #[test]
    fn test_random_session_name_shape() {
        let name = random_session_name();
        let suffix = name.strip_prefix(SESSION_PREFIX).unwrap();
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_session_names_differ() {
        assert_ne!(random_session_name(), random_session_name());
    }

    #[test]
    fn test_fallback_on_rng_failure() {
        let name = session_name_from(&mut BrokenRng);
        assert_eq!(name, format!("terraform-session-{}", std::process::id()));
    }
}
