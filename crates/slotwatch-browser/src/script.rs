//! Page scripts used to resolve [`Locator`]s inside the browser.
//!
//! Every script returns a JSON string so results decode the same way whether
//! the value is a bool, a string or `null`.

use slotwatch_core::Locator;

/// Attribute used to hand a located element over to native CDP calls.
pub(crate) const MARK_ATTR: &str = "data-slotwatch-mark";

fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Expression evaluating to the array of elements matching `locator` (ignoring `nth`).
fn candidates(locator: &Locator) -> String {
    let text = locator
        .text
        .as_deref()
        .map_or_else(|| "null".to_string(), js_str);
    format!(
        r#"(() => {{
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
  const names = (el) => {{
    const label = el.labels && el.labels.length ? el.labels[0].innerText : '';
    return [
      el.getAttribute('aria-label'), el.getAttribute('alt'), el.getAttribute('placeholder'),
      el.getAttribute('title'), label, el.innerText, el.textContent,
    ].map(norm).filter(Boolean);
  }};
  let els = Array.from(document.querySelectorAll({css}));
  const text = {text};
  if (text !== null) {{
    const want = norm(text);
    els = els.filter((el) => names(el).some((n) => {exact} ? n === want : n.includes(want)));
  }}
  return els;
}})()"#,
        css = js_str(&locator.css),
        text = text,
        exact = locator.exact,
    )
}

/// Wrap `body` (which sees `el`, possibly `null`) and JSON-encode its return value.
fn with_element(locator: &Locator, body: &str) -> String {
    format!(
        "(() => {{ const el = {}[{}] || null; return JSON.stringify((() => {{ {body} }})()); }})()",
        candidates(locator),
        locator.nth
    )
}

pub(crate) fn is_visible(locator: &Locator) -> String {
    with_element(
        locator,
        "if (!el) return false;
         const r = el.getBoundingClientRect();
         const st = window.getComputedStyle(el);
         return r.width > 0 && r.height > 0 && st.visibility !== 'hidden' && st.display !== 'none';",
    )
}

/// Tag the located element with `token`; optionally clear its value first.
pub(crate) fn mark(locator: &Locator, token: &str, clear: bool) -> String {
    let clear_js = if clear {
        "if ('value' in el) { el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); }"
    } else {
        ""
    };
    with_element(
        locator,
        &format!(
            "if (!el) return false;
             el.scrollIntoView({{ block: 'center' }});
             {clear_js}
             el.setAttribute('{MARK_ATTR}', {token});
             return true;",
            token = js_str(token),
        ),
    )
}

pub(crate) fn marked_selector(token: &str) -> String {
    format!("[{MARK_ATTR}=\"{token}\"]")
}

pub(crate) fn attribute(locator: &Locator, name: &str) -> String {
    with_element(
        locator,
        &format!("return el ? el.getAttribute({}) : null;", js_str(name)),
    )
}

pub(crate) fn texts(locator: &Locator) -> String {
    format!(
        "JSON.stringify({}.map((el) => (el.innerText || el.textContent || '').trim()))",
        candidates(locator)
    )
}

pub(crate) const PAGE_TEXT: &str =
    "JSON.stringify(document.body ? (document.body.innerText || document.body.textContent || '') : '')";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_are_escaped() {
        let loc = Locator::with_text("img[alt=\"x\"]", "it's \"quoted\"");
        let script = is_visible(&loc);
        assert!(script.contains(r#""img[alt=\"x\"]""#));
        assert!(script.contains(r#""it's \"quoted\"""#));
    }

    #[test]
    fn test_nth_is_applied() {
        let script = attribute(&Locator::css("mat-select").nth(3), "aria-disabled");
        assert!(script.contains("[3] || null"));
        assert!(script.contains("\"aria-disabled\""));
    }

    #[test]
    fn test_text_filter_absent_without_text() {
        let script = texts(&Locator::css("mat-option"));
        assert!(script.contains("const text = null;"));
    }

    #[test]
    fn test_marked_selector() {
        assert_eq!(marked_selector("m7"), "[data-slotwatch-mark=\"m7\"]");
    }
}
