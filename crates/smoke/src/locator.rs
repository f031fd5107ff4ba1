//! Selector fallback chains

use crate::error::SmokeResult;
use crate::page::Page;

/// Ordered list of candidate selectors for one logical element
#[derive(Debug, Clone, Copy)]
pub struct SelectorChain {
    pub label: &'static str,
    pub candidates: &'static [&'static str],
}

pub const EMAIL_INPUT: SelectorChain = SelectorChain {
    label: "email input",
    candidates: &[
        r#"input[type="email"]"#,
        r#"input[name="email"]"#,
        r#"input[placeholder*="email" i]"#,
        r#"input[id*="email" i]"#,
    ],
};

pub const PASSWORD_INPUT: SelectorChain = SelectorChain {
    label: "password input",
    candidates: &[
        r#"input[type="password"]"#,
        r#"input[name="password"]"#,
        r#"input[placeholder*="password" i]"#,
        r#"input[id*="password" i]"#,
    ],
};

pub const SUBMIT_BUTTON: SelectorChain = SelectorChain {
    label: "submit button",
    candidates: &[
        r#"button:has-text("Sign In")"#,
        r#"button[type="submit"]"#,
        r#"button:has-text("Login")"#,
        r#"input[type="submit"]"#,
    ],
};

impl SelectorChain {
    /// First candidate that matches at least one element
    pub async fn first_match(&self, page: &dyn Page) -> SmokeResult<Option<&'static str>> {
        for &selector in self.candidates {
            if page.count(selector).await? > 0 {
                tracing::debug!("{} matched {}", self.label, selector);
                return Ok(Some(selector));
            }
        }
        tracing::debug!("no candidate matched for {}", self.label);
        Ok(None)
    }
}
