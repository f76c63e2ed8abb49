use indexmap::IndexMap;

/// Named-field lookup over the first `{{...}}` template block in a page's
/// wikitext. Values are the raw enclosed text; `get` trims surrounding
/// whitespace. Nested markup inside values is not validated.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    fields: IndexMap<String, String>,
}

impl Template {
    /// Locate and parse the first top-level template invocation.
    /// Returns `None` when the markup holds no balanced `{{...}}` block.
    pub fn parse(markup: &str) -> Option<Self> {
        let start = markup.find("{{")?;
        let segments = split_segments(&markup[start..])?;

        let mut fields = IndexMap::new();
        let mut positional = 0usize;
        for seg in &segments[1..] {
            match seg.split_once('=') {
                Some((name, value)) => {
                    fields.insert(name.trim().to_string(), value.to_string());
                }
                None => {
                    // MediaWiki numbers unnamed params from 1
                    positional += 1;
                    fields.insert(positional.to_string(), seg.to_string());
                }
            }
        }

        Some(Template {
            name: segments[0].trim().to_string(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Trimmed value of a field. Check `has` first or match the `Option`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|v| v.trim())
    }
}

/// Split the template starting at `text` (which begins with `{{`) into its
/// top-level `|`-separated segments. Pipes inside nested `{{...}}` or
/// `[[...]]` do not separate. Returns `None` if the block never closes.
fn split_segments(text: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut link_depth = 0usize;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with("{{") {
            depth += 1;
            if depth > 1 {
                current.push_str("{{");
            }
            i += 2;
        } else if rest.starts_with("}}") && depth > 0 {
            depth -= 1;
            if depth == 0 {
                segments.push(current);
                return Some(segments);
            }
            current.push_str("}}");
            i += 2;
        } else if rest.starts_with("[[") {
            link_depth += 1;
            current.push_str("[[");
            i += 2;
        } else if rest.starts_with("]]") {
            link_depth = link_depth.saturating_sub(1);
            current.push_str("]]");
            i += 2;
        } else {
            let c = rest.chars().next()?;
            if c == '|' && depth == 1 && link_depth == 0 {
                segments.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
            i += c.len_utf8();
        }
    }

    // Ran out of input with the block still open
    None
}

/// Remove `<syntaxhighlight>` wrapper tags so a template block wrapped in a
/// highlighter still parses. Applied to the text handed to `Template::parse`,
/// never to the raw body copied into records.
pub fn strip_syntax_highlighter(text: &str) -> String {
    text.replace("<syntaxhighlight lang=\"javascript\">", "")
        .replace("</syntaxhighlight>", "")
}
