use std::fmt;

pub const APP_NAME: &str = "Quote Calculator";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

/// Release tag when built from a tagged checkout, else `v<crate version>`.
pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// `Quote Calculator v1.0.0`, for banners and log lines.
pub struct AppBanner;

impl fmt::Display for AppBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", APP_NAME, version_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_tag_or_prefixed_version() {
        let label = version_label();
        match GIT_TAG {
            Some(tag) => assert_eq!(label, tag),
            None => assert_eq!(label, format!("v{APP_VERSION}")),
        }
        assert!(AppBanner.to_string().starts_with(APP_NAME));
    }
}
