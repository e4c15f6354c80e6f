//! URI templates: `http://example.org/emp/{}` with positional `{}` placeholders.

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart<'a> {
    Text(&'a str),
    Placeholder,
}

pub fn parts(template: &str) -> Vec<TemplatePart<'_>> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        if pos > 0 {
            out.push(TemplatePart::Text(&rest[..pos]));
        }
        out.push(TemplatePart::Placeholder);
        rest = &rest[pos + 2..];
    }
    if !rest.is_empty() {
        out.push(TemplatePart::Text(rest));
    }
    out
}

pub fn placeholder_count(template: &str) -> usize {
    template.matches("{}").count()
}

/// Fill the placeholders in order. `None` when the value count does not match.
pub fn instantiate(template: &str, values: &[String]) -> Option<String> {
    if placeholder_count(template) != values.len() {
        return None;
    }
    let mut out = String::with_capacity(template.len());
    let mut values = values.iter();
    for part in parts(template) {
        match part {
            TemplatePart::Text(text) => out.push_str(text),
            TemplatePart::Placeholder => out.push_str(values.next()?),
        }
    }
    Some(out)
}

/// Decompose `iri` against `template`, returning the placeholder values.
///
/// Placeholders match lazily and never span a `/` or `#` when the template
/// has text after them, so `http://ex.org/{}/{}` splits on path segments.
pub fn decompose(template: &str, iri: &str) -> Option<Vec<String>> {
    let mut pattern = String::from("^");
    let template_parts = parts(template);
    for (i, part) in template_parts.iter().enumerate() {
        match part {
            TemplatePart::Text(text) => pattern.push_str(&regex::escape(text)),
            TemplatePart::Placeholder => {
                if i + 1 == template_parts.len() {
                    pattern.push_str("(.+)");
                } else {
                    pattern.push_str("([^/#]+?)");
                }
            }
        }
    }
    pattern.push('$');
    let re = Regex::new(&pattern).ok()?;
    let captures = re.captures(iri)?;
    Some(
        captures
            .iter()
            .skip(1)
            .filter_map(|m| m.map(|m| m.as_str().to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instantiate_fills_in_order() {
        let iri = instantiate("http://ex.org/{}/{}", &["a".into(), "1".into()]);
        assert_eq!(iri.as_deref(), Some("http://ex.org/a/1"));
        assert_eq!(instantiate("http://ex.org/{}", &[]), None);
    }

    #[test]
    fn decompose_inverts_instantiate() {
        let values = decompose("http://ex.org/emp/{}/dept/{}", "http://ex.org/emp/7/dept/42");
        assert_eq!(values, Some(vec!["7".to_string(), "42".to_string()]));
        assert_eq!(decompose("http://ex.org/emp/{}", "http://ex.org/dept/7"), None);
    }

    #[test]
    fn constant_template_matches_only_itself() {
        assert_eq!(decompose("http://ex.org/a", "http://ex.org/a"), Some(vec![]));
        assert_eq!(decompose("http://ex.org/a", "http://ex.org/b"), None);
    }
}
