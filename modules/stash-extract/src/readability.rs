// Readability-style article extraction via spider_transformations.

use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};

/// Main-content markdown for an HTML page, or `None` when the transform
/// produced nothing usable.
pub(crate) fn readable_markdown(html: &str, url: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    let markdown = transform_content_input(input, &config);
    let trimmed = markdown.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
