/// Writes `values` into `out` through `f`, inserting `separator` between the
/// fragments that actually produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Lowercases a database identifier into the mapped property convention:
/// `FirstName` becomes `first_name`, `EmployeeID` becomes `employee_id`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if *c == ' ' || *c == '-' {
            out.push('_');
        } else {
            out.push(*c);
        }
    }
    out
}

/// Longest prefix of `text` within `max` bytes, cut on a char boundary.
pub fn truncate_on_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::truncate_on_boundary(&$query, 497).trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_identifiers() {
        assert_eq!(snake_case("FirstName"), "first_name");
        assert_eq!(snake_case("EmployeeKey"), "employee_key");
        assert_eq!(snake_case("EmployeeID"), "employee_id");
        assert_eq!(snake_case("XMLDocument"), "xml_document");
        assert_eq!(snake_case("already_snake"), "already_snake");
        assert_eq!(snake_case("Order Date"), "order_date");
    }

    #[test]
    fn truncation_never_splits_a_character() {
        let text = "コメント".repeat(50);
        let cut = truncate_on_boundary(&text, 497);
        assert!(cut.len() <= 497);
        assert!(text.starts_with(cut));
        let rendered = format!("{}", truncate_long!(text));
        assert!(rendered.ends_with("..."));

        let short = "SELECT 1";
        assert_eq!(truncate_on_boundary(short, 497), short);
    }

    #[test]
    fn separated_by_skips_empty_fragments() {
        let mut out = String::new();
        separated_by(
            &mut out,
            ["a", "", "b"],
            |out, v| out.push_str(v),
            ", ",
        );
        assert_eq!(out, "a, b");
    }
}
