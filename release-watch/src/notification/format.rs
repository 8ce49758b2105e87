//! Message rendering shared by all channels.
//!
//! Each channel picks a [`Markup`] and a [`MessageLimit`]; [`render_message`]
//! returns the richest rendering that fits. The link to the release is
//! always kept.

use std::borrow::Cow;

use crate::domain::{ReleaseEvent, SourceKind};

/// Placeholder for a release without release notes.
const NO_CHANGELOG: &str = "No changelog provided.";

/// Emphasis and escaping rules of a service's message markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// CommonMark as rendered by ntfy, Gotify and Discord.
    Markdown,
    /// Slack mrkdwn: single-asterisk bold, `&`, `<` and `>` escaped.
    SlackMrkdwn,
}

impl Markup {
    fn bold(self, text: &str) -> String {
        match self {
            Self::Markdown => format!("**{text}**"),
            Self::SlackMrkdwn => format!("*{text}*"),
        }
    }

    /// Escape text taken from a release so it cannot be read as markup.
    pub fn escape(self, text: &str) -> Cow<'_, str> {
        match self {
            Self::Markdown => Cow::Borrowed(text),
            Self::SlackMrkdwn if text.contains(['&', '<', '>']) => Cow::Owned(
                text.replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;"),
            ),
            Self::SlackMrkdwn => Cow::Borrowed(text),
        }
    }
}

/// Size cap of a message body, in the unit the service counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLimit {
    /// Unicode scalar values, as chat services count.
    Chars(usize),
    /// UTF-8 bytes of the request body.
    Bytes(usize),
}

impl MessageLimit {
    pub fn max(self) -> usize {
        match self {
            Self::Chars(max) | Self::Bytes(max) => max,
        }
    }

    /// Length of `text` in this limit's unit.
    pub fn measure(self, text: &str) -> usize {
        match self {
            Self::Chars(_) => text.chars().count(),
            Self::Bytes(_) => text.len(),
        }
    }

    pub fn fits(self, text: &str) -> bool {
        self.measure(text) <= self.max()
    }

    /// Longest prefix of `text` measuring at most `budget`, cut on a char
    /// boundary.
    fn prefix(self, text: &str, budget: usize) -> &str {
        match self {
            Self::Chars(_) => match text.char_indices().nth(budget) {
                Some((end, _)) => &text[..end],
                None => text,
            },
            Self::Bytes(_) => {
                let mut end = budget.min(text.len());
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                &text[..end]
            }
        }
    }
}

/// Short headline, e.g. `New version for app`.
pub fn title(event: &ReleaseEvent) -> String {
    match event.source_kind() {
        SourceKind::SourceRepository => format!("New version for {}", event.display_name),
        SourceKind::ContainerImage => format!("Image updated: {}", event.display_name),
    }
}

/// Label for a link button.
pub fn link_label(event: &ReleaseEvent) -> &'static str {
    match event.source_kind() {
        SourceKind::SourceRepository => "View Release",
        SourceKind::ContainerImage => "View Image",
    }
}

fn header_lines(event: &ReleaseEvent, markup: Markup) -> String {
    let name = markup.escape(&event.display_name);
    let marker = markup.escape(&event.version_marker);
    let published = event.published_at_display();
    match event.source_kind() {
        SourceKind::SourceRepository => format!(
            "📌 {} {marker}\n\n📦 {} {name}\n\n📅 {} {published}",
            markup.bold("New version:"),
            markup.bold("For:"),
            markup.bold("Published on:"),
        ),
        SourceKind::ContainerImage => format!(
            "🐳 {} {name}\n\n🔐 {} `{marker}`\n\n📢 {} {published}",
            markup.bold("Docker image updated:"),
            markup.bold("New digest:"),
            markup.bold("Published:"),
        ),
    }
}

fn link_line(event: &ReleaseEvent, markup: Markup) -> String {
    format!("🔗 {} {}", markup.bold("Link:"), markup.escape(&event.url))
}

/// Everything, changelog included.
pub fn render_full(event: &ReleaseEvent, markup: Markup) -> String {
    match event.source_kind() {
        SourceKind::SourceRepository => {
            let changelog = event
                .changelog
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(NO_CHANGELOG);
            format!(
                "{}\n\n📝 {}\n\n```{}```\n\n{}",
                header_lines(event, markup),
                markup.bold("Changelog:"),
                markup.escape(&changelog.replace("```", "'''")),
                link_line(event, markup)
            )
        }
        SourceKind::ContainerImage => format!(
            "{}\n\n{}",
            header_lines(event, markup),
            link_line(event, markup)
        ),
    }
}

/// Headline fields and link, the changelog replaced by a pointer to the link.
pub fn render_compact(event: &ReleaseEvent, markup: Markup) -> String {
    match event.source_kind() {
        SourceKind::SourceRepository => format!(
            "{}\n\n📝 {} too long to include, see the link below.\n\n{}",
            header_lines(event, markup),
            markup.bold("Changelog:"),
            link_line(event, markup)
        ),
        SourceKind::ContainerImage => render_full(event, markup),
    }
}

/// Render a message within `limit` (no cap when `None`).
///
/// Falls back from the full rendering to the compact one, and finally cuts
/// the headline while keeping the link at the end.
pub fn render_message(event: &ReleaseEvent, markup: Markup, limit: Option<MessageLimit>) -> String {
    let full = render_full(event, markup);
    let Some(limit) = limit else {
        return full;
    };
    if limit.fits(&full) {
        return full;
    }

    let compact = render_compact(event, markup);
    if limit.fits(&compact) {
        return compact;
    }

    let tail = format!("…\n\n{}", link_line(event, markup));
    let tail_len = limit.measure(&tail);
    if tail_len > limit.max() {
        // Only the URL itself can still fit, or part of it.
        return limit.prefix(&markup.escape(&event.url), limit.max()).to_string();
    }

    let headline = header_lines(event, markup);
    let head = limit.prefix(&headline, limit.max() - tail_len);
    format!("{head}{tail}")
}
