use super::{IMAGE_HEIGHT, IMAGE_WIDTH, trim_host};
use sha2::{Digest, Sha256};

pub const DEFAULT_HOST: &str = "https://picsum.photos";

/// Number of distinct placeholder seeds.
pub const SEED_SPACE: u64 = 1000;

#[derive(Debug, Clone)]
pub struct PicsumService {
    host: String,
}

impl PicsumService {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn seed_url(&self, seed: u64) -> String {
        format!(
            "{}/seed/{}/{}/{}",
            trim_host(&self.host),
            seed,
            IMAGE_WIDTH,
            IMAGE_HEIGHT
        )
    }

    pub fn placeholder_url(&self, prompt: &str) -> String {
        self.seed_url(prompt_seed(prompt))
    }
}

impl Default for PicsumService {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

/// Stable across processes and platforms, unlike `DefaultHasher`.
pub fn prompt_seed(prompt: &str) -> u64 {
    let digest = Sha256::digest(prompt.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head) % SEED_SPACE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_deterministic_and_bounded() {
        let a = prompt_seed("a quiet harbour at dawn");
        let b = prompt_seed("a quiet harbour at dawn");
        assert_eq!(a, b);
        assert!(a < SEED_SPACE);
        assert!(prompt_seed("") < SEED_SPACE);
    }

    #[test]
    fn placeholder_url_shape() {
        let service = PicsumService::new("https://picsum.photos/");
        assert_eq!(service.seed_url(42), "https://picsum.photos/seed/42/1080/1920");
        let url = service.placeholder_url("neon city");
        assert!(url.starts_with("https://picsum.photos/seed/"));
        assert!(url.ends_with("/1080/1920"));
    }
}
