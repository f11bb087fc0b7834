use super::{IMAGE_HEIGHT, IMAGE_WIDTH, trim_host, url_encode_component};

/// Appended to every prompt sent to the generator.
pub const STYLE_SUFFIX: &str = "vertical, 9:16, 4k, photorealistic, cinematic lighting";

pub const DEFAULT_HOST: &str = "https://image.pollinations.ai";
pub const DEFAULT_MODEL: &str = "flux";

#[derive(Debug, Clone)]
pub struct PollinationsService {
    host: String,
    model: String,
}

impl PollinationsService {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            model: model.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt_url(&self, prompt: &str) -> String {
        let styled = format!("{}, {}", prompt, STYLE_SUFFIX);
        format!(
            "{}/prompt/{}?width={}&height={}&model={}&nologo=true",
            trim_host(&self.host),
            url_encode_component(&styled),
            IMAGE_WIDTH,
            IMAGE_HEIGHT,
            url_encode_component(&self.model),
        )
    }
}

impl Default for PollinationsService {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_url_carries_style_and_frame() {
        let service = PollinationsService::default();
        let url = service.prompt_url("a red fox");
        assert_eq!(
            url,
            "https://image.pollinations.ai/prompt/a%20red%20fox%2C%20vertical%2C%209%3A16%2C%204k%2C%20photorealistic%2C%20cinematic%20lighting?width=1080&height=1920&model=flux&nologo=true"
        );
    }

    #[test]
    fn custom_host_and_model() {
        let service = PollinationsService::new("http://localhost:9000/", "turbo");
        let url = service.prompt_url("x");
        assert!(url.starts_with("http://localhost:9000/prompt/x%2C%20vertical"));
        assert!(url.ends_with("&model=turbo&nologo=true"));
    }
}
