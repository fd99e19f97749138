//! Tracker wiki markup to CommonMark.
//!
//! Block constructs (headings, lists, tables, quotes, code blocks) are
//! handled line by line; inline constructs are rewritten within each line.
//! Code and noformat blocks pass through untouched.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Stashed spans are replaced by `\0{index}\0` while emphasis is rewritten,
/// so URLs and monospace text never pick up emphasis markers.
const STASH: char = '\u{0}';

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid markup pattern"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"^h([1-6])\.\s*(.*)$")
}

fn list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"^\s*([*#]+|-)\s+(.*)$")
}

fn code_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"^\s*\{(code|noformat)(?::([^}]*))?\}(.*)$")
}

fn monospace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"\{\{(.+?)\}\}")
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"!([^!|\s][^!|\n]*)(?:\|[^!\n]*)?!")
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"\[([^\[\]|\n]*)(?:\|([^\[\]|\n]+))?(?:\|[^\[\]\n]*)?\]")
}

fn color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"\{color(?::[^}]*)?\}")
}

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"\?\?([^?\n]+)\?\?")
}

fn stash_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, "\u{0}(\\d+)\u{0}")
}

/// Convert tracker wiki markup into markdown.
pub fn jira_to_markdown(input: &str) -> String {
    let text = input.replace("\r\n", "\n");
    let mut out: Vec<String> = Vec::new();
    let mut code_block = false;
    let mut code_tag = "";
    let mut in_quote = false;

    for line in text.split('\n') {
        if code_block {
            let close = format!("{{{code_tag}}}");
            match line.find(&close) {
                Some(pos) => {
                    if !line[..pos].is_empty() {
                        out.push(line[..pos].to_string());
                    }
                    out.push("```".to_string());
                    code_block = false;
                    let rest = &line[pos + close.len()..];
                    if !rest.trim().is_empty() {
                        out.push(convert_inline(rest));
                    }
                }
                None => out.push(line.to_string()),
            }
            continue;
        }

        if let Some(caps) = code_open_re().captures(line) {
            let tag = if &caps[1] == "code" { "code" } else { "noformat" };
            let lang = caps.get(2).map_or("", |m| code_language(m.as_str()));
            out.push(format!("```{lang}"));
            let rest = caps.get(3).map_or("", |m| m.as_str());
            let close = format!("{{{tag}}}");
            match rest.find(&close) {
                Some(pos) => {
                    if !rest[..pos].is_empty() {
                        out.push(rest[..pos].to_string());
                    }
                    out.push("```".to_string());
                }
                None => {
                    if !rest.is_empty() {
                        out.push(rest.to_string());
                    }
                    code_block = true;
                    code_tag = tag;
                }
            }
            continue;
        }

        if line.trim() == "{quote}" {
            in_quote = !in_quote;
            continue;
        }

        let converted = convert_line(line);
        if in_quote {
            out.push(format!("> {converted}"));
        } else {
            out.push(converted);
        }
    }

    if code_block {
        out.push("```".to_string());
    }
    expand_table_headers(out).join("\n")
}

/// `{code:java}`, `{code:language=java|title=x}` and `{code:title=x}` parameters.
fn code_language(params: &str) -> &str {
    for part in params.split('|') {
        let part = part.trim();
        if let Some(lang) = part.strip_prefix("language=") {
            return lang.trim();
        }
        if !part.contains('=') {
            return part;
        }
    }
    ""
}

fn convert_line(line: &str) -> String {
    if let Some(caps) = heading_re().captures(line) {
        let level: usize = caps[1].parse().unwrap_or(1);
        return format!("{} {}", "#".repeat(level), convert_inline(&caps[2]));
    }
    if let Some(rest) = line.strip_prefix("bq. ") {
        return format!("> {}", convert_inline(rest));
    }
    if line.trim().len() >= 4 && line.trim().chars().all(|c| c == '-') {
        return "---".to_string();
    }
    if let Some(caps) = list_re().captures(line) {
        return convert_list_item(&caps[1], &caps[2]);
    }
    let trimmed = line.trim_start();
    if trimmed.starts_with("||") {
        return table_row(trimmed, "||", true);
    }
    if trimmed.starts_with('|') {
        return table_row(trimmed, "|", false);
    }
    convert_inline(line)
}

fn convert_list_item(markers: &str, content: &str) -> String {
    let mut indent = String::new();
    let depth = markers.chars().count();
    for marker in markers.chars().take(depth.saturating_sub(1)) {
        indent.push_str(if marker == '#' { "   " } else { "  " });
    }
    let bullet = if markers.ends_with('#') { "1." } else { "*" };
    format!("{indent}{bullet} {}", convert_inline(content))
}

/// Marker emitted after a header row so the separator line can be
/// inserted once the column count is known.
const HEADER_MARK: &str = "\u{1}header";

fn table_row(line: &str, sep: &str, header: bool) -> String {
    let body = line.trim_end();
    let body = body.strip_prefix(sep).unwrap_or(body);
    let body = body.strip_suffix(sep).unwrap_or(body);
    let cells: Vec<String> = split_cells(body, sep)
        .iter()
        .map(|c| convert_inline(c.trim()))
        .collect();
    let row = format!("| {} |", cells.join(" | "));
    if header {
        format!("{row}{HEADER_MARK}{}", cells.len())
    } else {
        row
    }
}

/// Split on `sep` outside of `[...]` links and `{...}` macros.
fn split_cells<'a>(body: &'a str, sep: &str) -> Vec<&'a str> {
    let mut cells = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    let bytes = body.as_bytes();
    while i < bytes.len() {
        match bytes[i] {
            b'[' | b'{' => depth += 1,
            b']' | b'}' => depth = (depth - 1).max(0),
            _ => {}
        }
        if depth == 0 && bytes[i..].starts_with(sep.as_bytes()) {
            cells.push(&body[start..i]);
            i += sep.len();
            start = i;
            continue;
        }
        i += 1;
    }
    cells.push(&body[start..]);
    cells
}

fn expand_table_headers(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        match line.split_once(HEADER_MARK) {
            Some((row, count)) => {
                let count: usize = count.parse().unwrap_or(1);
                out.push(row.to_string());
                out.push(format!("|{}", " --- |".repeat(count)));
            }
            None => out.push(line),
        }
    }
    out
}

fn convert_inline(text: &str) -> String {
    let mut stash: Vec<String> = Vec::new();
    let text = monospace_re().replace_all(text, |caps: &Captures| {
        keep(&mut stash, format!("`{}`", &caps[1]))
    });
    let text = replace_images(&text, &mut stash);
    let text = link_re().replace_all(&text, |caps: &Captures| {
        let first = caps[1].trim();
        let link = match caps.get(2) {
            Some(url) => format!("[{}]({})", first, url.as_str().trim()),
            None if first.starts_with('~') => format!("@{}", &first[1..]),
            None if looks_like_url(first) => format!("<{first}>"),
            None => return caps[0].to_string(),
        };
        keep(&mut stash, link)
    });
    let text = color_re().replace_all(&text, "");
    let text = citation_re().replace_all(&text, "<cite>$1</cite>");

    let text = convert_delimited(&text, '*', "**", "**", false);
    let text = convert_delimited(&text, '_', "*", "*", false);
    let text = convert_delimited(&text, '-', "~~", "~~", false);
    let text = convert_delimited(&text, '+', "<ins>", "</ins>", false);
    let text = convert_delimited(&text, '^', "<sup>", "</sup>", true);
    let text = convert_delimited(&text, '~', "<sub>", "</sub>", true);
    let text = text.replace("\\\\", "  \n");

    stash_ref_re()
        .replace_all(&text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| stash.get(i).cloned())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Image embeds. A candidate whose name ends in whitespace opened on a stray
/// `!` in prose; scanning resumes right after that `!`.
fn replace_images(text: &str, stash: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(caps) = image_re().captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };
        let name = &caps[1];
        if name.ends_with(char::is_whitespace) {
            out.push_str(&text[pos..=whole.start()]);
            pos = whole.start() + 1;
            continue;
        }
        out.push_str(&text[pos..whole.start()]);
        out.push_str(&keep(stash, format!("![]({name})")));
        pos = whole.end();
    }
    out.push_str(&text[pos..]);
    out
}

fn keep(stash: &mut Vec<String>, span: String) -> String {
    stash.push(span);
    format!("{STASH}{}{STASH}", stash.len() - 1)
}

fn looks_like_url(s: &str) -> bool {
    ["http://", "https://", "file://", "mailto:", "ftp://"]
        .iter()
        .any(|p| s.starts_with(p))
}

/// Rewrite `{delim}text{delim}` spans to `{open}text{close}`.
///
/// A span opens at a delimiter not preceded by an alphanumeric and not
/// followed by whitespace, and closes at the next delimiter on the line that
/// is not preceded by whitespace and not followed by an alphanumeric.
/// `intraword` spans (super/subscript) skip the alphanumeric checks.
fn convert_delimited(text: &str, delim: char, open: &str, close: &str, intraword: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == delim && opens_span(&chars, i, delim, intraword) {
            if let Some(end) = find_close(&chars, i + 1, delim, intraword) {
                out.push_str(open);
                out.extend(&chars[i + 1..end]);
                out.push_str(close);
                i = end + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn opens_span(chars: &[char], i: usize, delim: char, intraword: bool) -> bool {
    let before_ok =
        i == 0 || chars[i - 1] != delim && (intraword || !chars[i - 1].is_alphanumeric());
    let after_ok = chars
        .get(i + 1)
        .is_some_and(|c| !c.is_whitespace() && *c != delim);
    before_ok && after_ok
}

fn find_close(chars: &[char], from: usize, delim: char, intraword: bool) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        let c = chars[j];
        if c == '\n' {
            return None;
        }
        if c == delim && j > from && !chars[j - 1].is_whitespace() {
            let after_ok = chars
                .get(j + 1)
                .map_or(true, |n| *n != delim && (intraword || !n.is_alphanumeric()));
            if after_ok {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings() {
        assert_eq!(jira_to_markdown("h1. Title"), "# Title");
        assert_eq!(jira_to_markdown("h3. *Bold* part"), "### **Bold** part");
    }

    #[test]
    fn emphasis() {
        assert_eq!(jira_to_markdown("a *bold* b"), "a **bold** b");
        assert_eq!(jira_to_markdown("a _it_ b"), "a *it* b");
        assert_eq!(jira_to_markdown("*a* and *b*"), "**a** and **b**");
        assert_eq!(jira_to_markdown("-gone-"), "~~gone~~");
        assert_eq!(jira_to_markdown("+new+"), "<ins>new</ins>");
        assert_eq!(jira_to_markdown("x^2^ H~2~O"), "x<sup>2</sup> H<sub>2</sub>O");
        assert_eq!(jira_to_markdown("??Someone??"), "<cite>Someone</cite>");
    }

    #[test]
    fn words_with_delimiters_are_untouched() {
        assert_eq!(jira_to_markdown("snake_case_name"), "snake_case_name");
        assert_eq!(jira_to_markdown("re-run the well-known job"), "re-run the well-known job");
        assert_eq!(jira_to_markdown("2 * 3 * 4"), "2 * 3 * 4");
    }

    #[test]
    fn monospace_protects_content() {
        assert_eq!(jira_to_markdown("run {{cargo *test*}}"), "run `cargo *test*`");
    }

    #[test]
    fn links() {
        assert_eq!(
            jira_to_markdown("see [docs|https://example.com/a_b_c]"),
            "see [docs](https://example.com/a_b_c)"
        );
        assert_eq!(
            jira_to_markdown("[https://example.com]"),
            "<https://example.com>"
        );
        assert_eq!(jira_to_markdown("ping [~jdoe]"), "ping @jdoe");
        assert_eq!(jira_to_markdown("array[0]"), "array[0]");
    }

    #[test]
    fn images() {
        assert_eq!(
            jira_to_markdown("!file:///tmp/c/image-1.png|width=200!"),
            "![](file:///tmp/c/image-1.png)"
        );
        assert_eq!(jira_to_markdown("Wow! Great!"), "Wow! Great!");
    }

    #[test]
    fn image_after_stray_bang() {
        assert_eq!(
            jira_to_markdown("Hi!there !image-1.png!"),
            "Hi!there ![](image-1.png)"
        );
        assert_eq!(
            jira_to_markdown("Done! See !a.png! and !b.png|thumbnail!"),
            "Done! See ![](a.png) and ![](b.png)"
        );
    }

    #[test]
    fn lists() {
        let input = "* one\n** nested\n# first\n## sub\n- dash";
        let expected = "* one\n  * nested\n1. first\n   1. sub\n* dash";
        assert_eq!(jira_to_markdown(input), expected);
    }

    #[test]
    fn code_blocks_are_verbatim() {
        let input = "{code:java}\nint *x* = a_b_c;\n{code}\nafter *bold*";
        let expected = "```java\nint *x* = a_b_c;\n```\nafter **bold**";
        assert_eq!(jira_to_markdown(input), expected);

        let input = "{noformat}\nh1. not a heading\n{noformat}";
        assert_eq!(jira_to_markdown(input), "```\nh1. not a heading\n```");

        assert_eq!(jira_to_markdown("{code}x = 1{code}"), "```\nx = 1\n```");
        assert_eq!(
            jira_to_markdown("{code:title=Foo.rs|language=rust}\nfn f() {}\n{code}"),
            "```rust\nfn f() {}\n```"
        );
    }

    #[test]
    fn unterminated_code_block_is_closed() {
        assert_eq!(jira_to_markdown("{code}\nlet a = 1;"), "```\nlet a = 1;\n```");
    }

    #[test]
    fn quotes() {
        assert_eq!(jira_to_markdown("bq. quoted"), "> quoted");
        assert_eq!(
            jira_to_markdown("{quote}\nline one\nline *two*\n{quote}"),
            "> line one\n> line **two**"
        );
    }

    #[test]
    fn tables() {
        let input = "||Name||Link||\n|a|[x|https://x.io]|";
        let expected = "| Name | Link |\n| --- | --- |\n| a | [x](https://x.io) |";
        assert_eq!(jira_to_markdown(input), expected);
    }

    #[test]
    fn misc() {
        assert_eq!(jira_to_markdown("----"), "---");
        assert_eq!(jira_to_markdown("{color:red}alert{color}"), "alert");
        assert_eq!(jira_to_markdown("a\\\\b"), "a  \nb");
        assert_eq!(jira_to_markdown("one\r\ntwo"), "one\ntwo");
        assert_eq!(jira_to_markdown(""), "");
    }
}
