//! Message rendering
//!
//! A change carries only its id and positional arguments; the text is
//! produced on demand by a [`Localizer`]. [`English`] renders the
//! templates of the rule catalogue.

use crate::catalog;
use apicompat_core::Change;

/// Maps a change id and its arguments to display text
pub trait Localizer {
    /// `None` when the id is unknown to this localizer
    fn localize(&self, id: &str, args: &[String]) -> Option<String>;

    /// Full message for a change, detail comment appended
    fn message(&self, change: &Change) -> String {
        let text = self
            .localize(&change.id, &change.args)
            .unwrap_or_else(|| format!("{} {}", change.id, change.args.join(" ")).trim_end().to_string());

        match &change.comment {
            Some(comment) => format!("{} {}", text, comment),
            None => text,
        }
    }
}

/// The built-in English catalogue
#[derive(Debug, Clone, Copy, Default)]
pub struct English;

impl Localizer for English {
    fn localize(&self, id: &str, args: &[String]) -> Option<String> {
        catalog::by_id(id).map(|entry| render(entry.template, args))
    }
}

/// Substitute `{n}` placeholders in one pass; substituted text is never
/// re-scanned and out-of-range placeholders are kept verbatim
pub fn render(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        let placeholder = tail.find('}').and_then(|close| {
            let index: usize = tail[1..close].parse().ok()?;
            Some((index, close))
        });

        match placeholder {
            Some((index, close)) if index < args.len() => {
                out.push_str(&args[index]);
                rest = &tail[close + 1..];
            }
            _ => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
