// String-level HTML helpers for portal pages. Tag and attribute names match
// case-insensitively; no DOM is built.

use once_cell::sync::Lazy;
use regex::Regex;

// html2text decorations: "[text][1]" link references and "[1]: url" footnotes
static LINK_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]\n]*)\]\[\d+\]").expect("valid regex"));
static FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\[\d+\]: .*$").expect("valid regex"));

/// ASCII-only lowercasing. Byte offsets stay valid against the original string.
pub fn to_lowercase_fast(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Every opening tag `<tag ...>` in `html`, as the slice from `<` to `>`.
pub fn open_tags<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lowercase_fast(html);
    let needle = format!("<{}", to_lowercase_fast(tag));
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = lc[from..].find(&needle) {
        let start = from + rel;
        let after = start + needle.len();
        from = after;
        let boundary = lc[after..].chars().next();
        if !matches!(boundary, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            continue;
        }
        let Some(end_rel) = html[start..].find('>') else {
            break;
        };
        out.push(&html[start..start + end_rel + 1]);
        from = start + end_rel + 1;
    }
    out
}

/// Non-nesting elements such as `<option>`, `<title>` or `<a>`:
/// pairs of (opening tag, inner HTML).
pub fn elements<'a>(html: &'a str, tag: &str) -> Vec<(&'a str, &'a str)> {
    let lc = to_lowercase_fast(html);
    let close = format!("</{}", to_lowercase_fast(tag));
    open_tags(html, tag)
        .into_iter()
        .map(|open| {
            let inner_start = offset_in(html, open) + open.len();
            let inner_end = lc[inner_start..]
                .find(&close)
                .map(|i| inner_start + i)
                .unwrap_or(html.len());
            (open, &html[inner_start..inner_end])
        })
        .collect()
}

/// Byte offset of `part` within `whole`; `part` must be a subslice of it.
fn offset_in(whole: &str, part: &str) -> usize {
    part.as_ptr() as usize - whole.as_ptr() as usize
}

/// Value of attribute `name` in an opening tag, entity-decoded.
pub fn attr(open_tag: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?i)[\s<]{}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(open_tag)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| decode_entities(m.as_str()))
}

/// Whether the tag's `class` attribute contains `class` as a whole word.
pub fn has_class(open_tag: &str, class: &str) -> bool {
    attr(open_tag, "class")
        .map(|c| c.split_whitespace().any(|w| w.eq_ignore_ascii_case(class)))
        .unwrap_or(false)
}

/// Inner HTML of the first `<div>` carrying `class`, honouring nested divs.
pub fn div_with_class<'a>(html: &'a str, class: &str) -> Option<&'a str> {
    divs_where(html, |t| has_class(t, class)).into_iter().next()
}

/// Inner HTML of every `<div>` whose opening tag satisfies `pred`.
pub fn divs_where<'a>(html: &'a str, pred: impl Fn(&str) -> bool) -> Vec<&'a str> {
    let lc = to_lowercase_fast(html);
    open_tags(html, "div")
        .into_iter()
        .filter(|t| pred(t))
        .map(|open| {
            let start = offset_in(html, open) + open.len();
            &html[start..div_end(&lc, start)]
        })
        .collect()
}

fn div_end(lc: &str, start: usize) -> usize {
    let mut depth = 1usize;
    let mut pos = start;
    loop {
        let next_open = lc[pos..].find("<div").map(|i| pos + i);
        let next_close = lc[pos..].find("</div").map(|i| pos + i);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                pos = o + 4;
            }
            (_, Some(c)) => {
                depth -= 1;
                if depth == 0 {
                    return c;
                }
                pos = c + 5;
            }
            (_, None) => return lc.len(),
        }
    }
}

/// Text of the element that follows the element holding `label`.
///
/// Covers the portal's `<th>Lähettäjä:</th><td>Name</td>` style metadata rows.
pub fn value_after_label(html: &str, label: &str) -> Option<String> {
    let lc = to_lowercase_fast(html);
    let at = lc.find(&to_lowercase_fast(label))?;
    // end of the element that contains the label
    let close = lc[at..].find("</").map(|i| at + i)?;
    let close_end = html[close..].find('>').map(|i| close + i + 1)?;
    // the next element's opening tag
    let open = lc[close_end..].find('<').map(|i| close_end + i)?;
    let open_end = html[open..].find('>').map(|i| open + i + 1)?;
    let name: String = lc[open + 1..open_end]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() {
        return None;
    }
    let inner_end = lc[open_end..]
        .find(&format!("</{name}"))
        .map(|i| open_end + i)?;
    let text = strip_tags(&html[open_end..inner_end]);
    (!text.is_empty()).then_some(text)
}

/// Index of the `]` closing the `[` at `open`, skipping brackets inside strings.
fn matching_bracket(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The JSON array literal starting at `open` inside a script block.
pub fn json_array_at(s: &str, open: usize) -> Option<&str> {
    if s.as_bytes().get(open) != Some(&b'[') {
        return None;
    }
    matching_bracket(s, open).map(|close| &s[open..=close])
}

/// Remove all tags, decode entities and collapse whitespace.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

/// Render an HTML fragment as readable plain text, keeping line structure.
/// Link footnotes and table borders are dropped.
pub fn to_text(fragment: &str) -> String {
    let rendered = match html2text::from_read(fragment.as_bytes(), 100) {
        Ok(text) => text,
        Err(_) => return strip_tags(fragment),
    };
    let rendered = FOOTNOTE.replace_all(&rendered, "");
    let rendered = LINK_REF.replace_all(&rendered, "$1");
    rendered
        .lines()
        .map(|line| line.trim_matches(is_box_drawing).trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_box_drawing(c: char) -> bool {
    ('\u{2500}'..='\u{257F}').contains(&c)
}

pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => {
                    if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collapse runs of whitespace into one space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}
