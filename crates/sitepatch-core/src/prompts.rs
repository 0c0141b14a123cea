//! System prompts and chat message assembly.
//!
//! The follow-up prompt teaches the model the marker protocol understood by
//! [`crate::patch`]; a test keeps the two in sync.

use crate::pages::Page;
use crate::transport::ChatMessage;

/// System prompt for generating a site from scratch.
pub const INITIAL_SYSTEM_PROMPT: &str = "\
ONLY USE HTML, CSS AND JAVASCRIPT. If you want to use icons make sure to import the library first. \
Try to create the best UI possible by using only HTML, CSS and JAVASCRIPT. \
Use TailwindCSS as much as you can for styling (load it with <script src=\"https://cdn.tailwindcss.com\"></script> in the head). \
If you can't do something with Tailwind, use custom CSS. \
Make it responsive. Elaborate as much as you can to create something unique. \
ALWAYS GIVE THE RESPONSE AS A SINGLE, COMPLETE HTML DOCUMENT, starting with <!DOCTYPE html> and ending with </html>. \
Do not add any explanation before or after the document.";

/// System prompt for editing existing pages with search/replace blocks.
pub const FOLLOW_UP_SYSTEM_PROMPT: &str = "\
You are an expert web developer modifying an existing HTML website. \
The user wants to apply changes based on their request. \
You MUST output ONLY the changes required using the following UPDATE_PAGE_START and SEARCH/REPLACE format. \
Do NOT output the entire file.
Explain nothing, output only the blocks.

To update a page:
1. Start with <<<<<<< UPDATE_PAGE_START followed by the page path, then >>>>>>> UPDATE_PAGE_END on the same line.
2. For each change, start with <<<<<<< SEARCH
3. Provide the exact lines from the current page that need to be replaced. They must match the current code exactly, including indentation and whitespace.
4. Use ======= to separate the search block from the replacement.
5. Provide the new lines that should replace the original lines.
6. End the block with >>>>>>> REPLACE
7. You can use multiple SEARCH/REPLACE blocks if changes are needed in different parts of the page.
8. To insert code at the very beginning of a page, use an empty SEARCH block.
9. To delete code, provide the lines to delete in the SEARCH block and leave the replacement empty.

To create a new page:
1. Start with <<<<<<< NEW_PAGE_START followed by the page path, then >>>>>>> NEW_PAGE_END on the same line.
2. Give the complete HTML document of the new page inside a ```html fenced block.
3. Link the new page from the existing pages where it makes sense, using UPDATE_PAGE_START blocks.

Example modifying the heading of the home page:
<<<<<<< UPDATE_PAGE_START / >>>>>>> UPDATE_PAGE_END
<<<<<<< SEARCH
    <h1>Old Title</h1>
=======
    <h1>New Title</h1>
>>>>>>> REPLACE

Example adding a page:
<<<<<<< NEW_PAGE_START /about.html >>>>>>> NEW_PAGE_END
```html
<!DOCTYPE html>
<html>
<body><h1>About</h1></body>
</html>
```";

/// Inputs of an initial-generation conversation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialContext<'a> {
    pub prompt: Option<&'a str>,
    /// Markdown rendering of an existing site to redesign.
    pub redesign_markdown: Option<&'a str>,
    pub pages: &'a [Page],
    pub previous_prompts: &'a [String],
}

/// Inputs of a follow-up edit conversation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpContext<'a> {
    pub prompt: &'a str,
    pub previous_prompts: &'a [String],
    /// Outer HTML of the element the user picked, if any.
    pub selected_element_html: Option<&'a str>,
    pub pages: &'a [Page],
    /// Image references the model may use.
    pub files: &'a [String],
}

fn bullet_list<'s>(items: impl IntoIterator<Item = &'s str>) -> String {
    items
        .into_iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn page_listing(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|page| format!("- {} \n{}", page.path, page.html))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Messages for generating a site, optionally continuing a multi-page one.
pub fn initial_messages(ctx: &InitialContext<'_>) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(INITIAL_SYSTEM_PROMPT)];

    if ctx.pages.len() > 1 {
        messages.push(ChatMessage::assistant(format!(
            "Here are the current pages:\n\n{}\n\nNow, please create a new page based on this code. \
             Also here are the previous prompts:\n\n{}",
            page_listing(ctx.pages),
            bullet_list(ctx.previous_prompts.iter().map(String::as_str)),
        )));
    }

    let request = match ctx.redesign_markdown.filter(|md| !md.is_empty()) {
        Some(markdown) => format!(
            "Here is my current design as a markdown:\n\n{markdown}\n\n\
             Now, please create a new design based on this markdown."
        ),
        None => ctx.prompt.unwrap_or_default().to_string(),
    };
    messages.push(ChatMessage::user(request));
    messages
}

/// Messages for a follow-up edit of existing pages.
pub fn follow_up_messages(ctx: &FollowUpContext<'_>) -> Vec<ChatMessage> {
    let history = if ctx.previous_prompts.is_empty() {
        "You are modifying the HTML file based on the user's request.".to_string()
    } else {
        format!(
            "Also here are the previous prompts:\n\n{}",
            bullet_list(ctx.previous_prompts.iter().map(String::as_str))
        )
    };

    let mut context = String::new();
    if let Some(element) = ctx.selected_element_html.filter(|html| !html.is_empty()) {
        context.push_str(&format!(
            "You have to update ONLY the following element, NOTHING ELSE: \n\n```html\n{element}\n```\n\n"
        ));
    }
    context.push_str(&format!("Current pages: {}.", page_listing(ctx.pages)));
    if !ctx.files.is_empty() {
        context.push_str(&format!(
            " Current images: {}.",
            bullet_list(ctx.files.iter().map(String::as_str))
        ));
    }

    vec![
        ChatMessage::system(FOLLOW_UP_SYSTEM_PROMPT),
        ChatMessage::user(history),
        ChatMessage::assistant(context),
        ChatMessage::user(ctx.prompt),
    ]
}
