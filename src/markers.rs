// `[VIZ:<file>]` markers the agent embeds in replies to point at stored charts

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::recognize,
    sequence::{delimited, tuple},
    IResult,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use crate::store::ArtifactStore;

const MARKER_OPEN: &str = "[VIZ:";

/// A piece of an agent reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text { text: String },
    Viz { id: String },
}

/// A marker matched against the artifact store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedViz {
    pub id: String,
    /// `None` when nothing is stored under `id`
    pub path: Option<PathBuf>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn artifact_name(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while1(is_name_char),
        char('.'),
        alt((tag("png"), tag("svg"))),
    )))(input)
}

/// `[VIZ:bar_0123abcd.png]` -> `bar_0123abcd.png`
pub fn viz_marker(input: &str) -> IResult<&str, &str> {
    delimited(tag(MARKER_OPEN), artifact_name, char(']'))(input)
}

/// Split a reply into text and marker segments, in order.
///
/// Anything that looks like a marker but does not parse stays as text.
/// Empty text segments are dropped.
pub fn parse_reply(reply: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = reply;

    while let Some(pos) = rest.find(MARKER_OPEN) {
        text.push_str(&rest[..pos]);
        match viz_marker(&rest[pos..]) {
            Ok((remaining, id)) => {
                if !text.is_empty() {
                    segments.push(Segment::Text {
                        text: std::mem::take(&mut text),
                    });
                }
                segments.push(Segment::Viz { id: id.to_string() });
                rest = remaining;
            }
            Err(_) => {
                text.push_str(MARKER_OPEN);
                rest = &rest[pos + MARKER_OPEN.len()..];
            }
        }
    }
    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text { text });
    }
    segments
}

/// Remove every marker, returning the trimmed text and the marker ids in order.
pub fn strip_markers(reply: &str) -> (String, Vec<String>) {
    let mut text = String::new();
    let mut ids = Vec::new();
    for segment in parse_reply(reply) {
        match segment {
            Segment::Text { text: t } => text.push_str(&t),
            Segment::Viz { id } => ids.push(id),
        }
    }
    (text.trim().to_string(), ids)
}

/// Look up each marker of `reply` in `store`. Missing files are logged, not fatal.
pub fn resolve_markers(reply: &str, store: &ArtifactStore) -> Vec<ResolvedViz> {
    let (_, ids) = strip_markers(reply);
    ids.into_iter()
        .map(|id| {
            let path = store.resolve(&id);
            if path.is_none() {
                warn!(id = %id, root = %store.root().display(), "visualization file not found");
            }
            ResolvedViz { id, path }
        })
        .collect()
}
