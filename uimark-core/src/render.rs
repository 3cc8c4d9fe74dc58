use std::path::Path;

use crate::item::ItemView;

const NO_COMMENTARY_PLACEHOLDER: &str = "_No commentary._";

pub fn render_item_markdown(source_path: &Path, view: &ItemView) -> String {
    let mut output = String::new();
    output.push_str("# Item\n\n");
    output.push_str(&format!("- Name: {} {}\n", view.emoji(), view.name()));
    output.push_str(&format!("- Source: `{}`\n", source_path.display()));
    output.push_str(&format!("- Chapters: {}\n\n", view.chapters().len()));

    if view.chapters().is_empty() {
        output.push_str("_No chapters found._\n");
        return output;
    }

    for (idx, chapter) in view.chapters().iter().enumerate() {
        let kind = if chapter.is_edit() { "edit" } else { "generation" };
        output.push_str(&format!(
            "## {}. Version {} ({kind})\n\n",
            idx + 1,
            chapter.version
        ));
        output.push_str(&format!("- Prompt: {}\n", one_line(&chapter.prompt)));

        let parsed = view.parsed(idx).unwrap_or_default();
        match parsed.html.as_deref() {
            Some(html) => output.push_str(&format!("- HTML: {} bytes\n\n", html.len())),
            None => output.push_str("- HTML: missing\n\n"),
        }

        let commentary = parsed.commentary.as_deref().unwrap_or(NO_COMMENTARY_PLACEHOLDER);
        output.push_str(commentary.trim());
        output.push_str("\n\n");
    }

    output
}

fn one_line(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        "_(empty)_".to_string()
    } else {
        joined
    }
}
