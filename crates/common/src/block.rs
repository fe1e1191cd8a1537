// Block-structured page content and its wire codec.
//
// The canonical wire form is a JSON object `{"blocks": [...]}` where
// each block is `{"type": ..., "data": ...}`. Legacy pages stored plain
// text; decoding upgrades that to one paragraph block per non-empty
// line. Decoding never fails — anything that is not canonical JSON
// takes the plain-text path.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One unit of structured content (paragraph, heading, list, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Block {
    /// A paragraph block wrapping one line of text.
    pub fn paragraph(text: &str) -> Self {
        Self { kind: "paragraph".to_string(), data: json!({ "text": text }) }
    }

    /// The text payload, for block kinds that carry one.
    pub fn text(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }
}

/// The body of a page: an ordered block sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlockList {
    pub blocks: Vec<Block>,
}

impl BlockList {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Upgrade legacy plain text: one trimmed paragraph per non-empty line.
    pub fn from_plain_text(raw: &str) -> Self {
        let blocks = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Block::paragraph)
            .collect();
        Self { blocks }
    }
}

/// A page document as the editor sees it: title plus block body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub title: String,
    pub body: BlockList,
}

/// Decode wire content into a block list.
///
/// Canonical JSON is used verbatim; anything else is treated as legacy
/// plain text.
pub fn decode(raw: &str) -> BlockList {
    match serde_json::from_str::<BlockList>(raw) {
        Ok(list) => list,
        Err(_) => BlockList::from_plain_text(raw),
    }
}

/// Encode a block list into its wire JSON form.
pub fn encode(body: &BlockList) -> String {
    serde_json::to_string(body).expect("block list has no unserializable members")
}
