/// Phrases that mark a prompt as a request for a generated image.
pub const IMAGE_KEYWORDS: &[&str] = &[
    "generate image",
    "draw",
    "create image",
    "picture of",
    "visualize",
];

/// Which collaborator a prompt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Reasoning,
    Image,
}

/// Route a prompt. Matching is a case-insensitive substring test and only
/// selects the image collaborator when an endpoint is configured.
pub fn classify(prompt: &str, image_endpoint: &str) -> Route {
    if image_endpoint.trim().is_empty() {
        return Route::Reasoning;
    }

    let lower = prompt.to_lowercase();
    if IMAGE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Route::Image
    } else {
        Route::Reasoning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://hooks.local/image";

    #[test]
    fn test_keywords_route_to_image() {
        assert_eq!(classify("draw a cat", ENDPOINT), Route::Image);
        assert_eq!(classify("Please VISUALIZE the court", ENDPOINT), Route::Image);
        assert_eq!(classify("a Picture Of the senate", ENDPOINT), Route::Image);
        assert_eq!(classify("generate image of a gavel", ENDPOINT), Route::Image);
    }

    #[test]
    fn test_without_endpoint_always_reasoning() {
        assert_eq!(classify("draw a cat", ""), Route::Reasoning);
        assert_eq!(classify("draw a cat", "   "), Route::Reasoning);
    }

    #[test]
    fn test_plain_questions_route_to_reasoning() {
        assert_eq!(classify("What is the Land Use Act?", ENDPOINT), Route::Reasoning);
        assert_eq!(classify("create an image", ENDPOINT), Route::Reasoning);
    }

    #[test]
    fn test_substring_match_inside_words() {
        // "withdraw" contains "draw"; matching is a plain substring test.
        assert_eq!(classify("can I withdraw my appeal", ENDPOINT), Route::Image);
    }
}
