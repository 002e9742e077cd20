//! Reference containers
//!
//! A [`PathContainer`] wraps a piece of text (a stylesheet, an attribute
//! value, a `srcset`) and can list the references embedded in it and
//! rewrite some of them while leaving every other byte untouched.

mod common;
mod css;
mod srcset;

pub use common::CommonTag;
pub use css::CssText;
pub use srcset::SrcsetTag;

use crate::config::SourceRule;
use std::collections::HashSet;

/// One rewrite: every exact occurrence of `old` becomes `new`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub old: String,
    pub new: String,
}

/// Text region holding references
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathContainer {
    Css(CssText),
    Common(CommonTag),
    Srcset(SrcsetTag),
}

impl PathContainer {
    /// Picks the container for the text located by `rule`
    ///
    /// `style` attributes and the text of `style` elements are CSS,
    /// `srcset` attributes are candidate lists, everything else is a single
    /// reference.
    pub fn for_rule(rule: &SourceRule, element_name: &str, text: impl Into<String>) -> Self {
        match rule.attr.as_deref() {
            Some(attr) if attr.eq_ignore_ascii_case("style") => Self::Css(CssText::new(text)),
            Some(attr) if attr.eq_ignore_ascii_case("srcset") => {
                Self::Srcset(SrcsetTag::new(text))
            }
            None if element_name.eq_ignore_ascii_case("style") => Self::Css(CssText::new(text)),
            _ => Self::Common(CommonTag::new(text)),
        }
    }

    /// References in the order they appear, without duplicates
    pub fn paths(&self) -> Vec<String> {
        match self {
            Self::Css(css) => css.paths(),
            Self::Common(tag) => tag.paths(),
            Self::Srcset(tag) => tag.paths(),
        }
    }

    /// Returns the text with the replacements applied
    pub fn update_text(&self, replacements: &[Replacement]) -> String {
        match self {
            Self::Css(css) => css.update_text(replacements),
            Self::Common(tag) => tag.update_text(replacements),
            Self::Srcset(tag) => tag.update_text(replacements),
        }
    }
}

pub(crate) fn dedup_in_order<I>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}
