use crate::models::{OutboundBlock, OutboundContent};
use crate::resolver::standalone_placeholder;

/// Convert article Markdown into blocks for the document API.
///
/// Each trimmed, non-blank line becomes one block. `####` and `###` both map to
/// a third-level heading; the document API has no fourth level in this path and
/// the collapse is kept as is. Image placeholders stay literal text; see
/// [`reinsert_images`] for turning them back into image blocks.
pub fn markdown_to_blocks(markdown: &str) -> Vec<OutboundBlock> {
    markdown
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| OutboundBlock {
            id: format!("md-{}", i + 1),
            content: classify_line(line),
        })
        .collect()
}

fn classify_line(line: &str) -> OutboundContent {
    if let Some(rest) = line.strip_prefix("####") {
        OutboundContent::Heading3 {
            text: rest.trim().to_string(),
        }
    } else if let Some(rest) = line.strip_prefix("###") {
        OutboundContent::Heading3 {
            text: rest.trim().to_string(),
        }
    } else if let Some(rest) = line.strip_prefix("##") {
        OutboundContent::Heading2 {
            text: rest.trim().to_string(),
        }
    } else if let Some(rest) = line.strip_prefix('#') {
        OutboundContent::Heading1 {
            text: rest.trim().to_string(),
        }
    } else {
        OutboundContent::Text {
            text: line.to_string(),
        }
    }
}

/// Replace text blocks that consist of a single in-range placeholder with image
/// blocks pointing at the matching source token.
///
/// `tokens[k - 1]` backs `image_k`. Out-of-range placeholders and placeholders
/// embedded in longer text are left as they are. Returns the new blocks and the
/// number of images inserted.
///
/// The index basis is the source token list. Preview numbers placeholders over
/// the images that resolved, so the two agree only while every image resolves;
/// after a failed download preview shifts later images down and publishing
/// does not.
pub fn reinsert_images(blocks: Vec<OutboundBlock>, tokens: &[&str]) -> (Vec<OutboundBlock>, usize) {
    let mut inserted = 0;

    let blocks = blocks
        .into_iter()
        .map(|block| {
            let OutboundContent::Text { text } = &block.content else {
                return block;
            };
            match standalone_placeholder(text) {
                Some(k) if (1..=tokens.len()).contains(&k) => {
                    inserted += 1;
                    OutboundBlock {
                        id: block.id,
                        content: OutboundContent::Image {
                            image_token: tokens[k - 1].to_string(),
                        },
                    }
                }
                _ => block,
            }
        })
        .collect();

    (blocks, inserted)
}
