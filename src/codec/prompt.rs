//! Prompt text sent to the generation backend.

use super::ForwardPrompt;

pub const SYSTEM_PROMPT: &str = "You are a professional writing assistant. \
Reorganize the draft material you are given into a well-structured, coherent article.

Rules:
1. Keep the core information and viewpoints of the source.
2. Improve the structure so the article reads logically.
3. Make the language fluent and natural.
4. If the source has images, mark where each one belongs with ![short description](image_N), \
where N is the image number starting from 1.
5. Write the article in Markdown.
6. Keep a professional, readable tone.";

/// First-turn prompt: source material plus the user's instruction.
pub fn create_prompt(source: &ForwardPrompt, instruction: &str) -> String {
    let mut prompt = format!(
        "Source material:\n{}\n\nInstruction:\n{}\n\nWrite a high-quality article based on the material and instruction above.",
        source.text,
        instruction.trim()
    );

    match source.images.len() {
        0 => {}
        1 => prompt.push_str(
            "\n\nNote: the document contains 1 image. Mark where it belongs with ![description](image_1).",
        ),
        n => prompt.push_str(&format!(
            "\n\nNote: the document contains {} images. Mark where each belongs with ![description](image_N), N from 1 to {}.",
            n, n
        )),
    }

    prompt
}

/// Follow-up prompt asking for a full revision of the current article.
pub fn refine_prompt(current_article: &str, instruction: &str) -> String {
    format!(
        "Current article:\n{}\n\nRequested changes:\n{}\n\nApply the requested changes and return the complete revised article in Markdown.",
        current_article,
        instruction.trim()
    )
}
