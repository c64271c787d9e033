pub const ANALYZE: &str = include_str!("../data/prompts/analyze.txt");
pub const HANDWRITING: &str = include_str!("../data/prompts/handwriting.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{{a}} and {{b}}", &[("a", "x")]), "x and {{b}}");
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!ANALYZE.is_empty());
        assert!(!HANDWRITING.is_empty());
    }

    #[test]
    fn test_handwriting_embeds_answer_after_instructions() {
        let prompt = render(HANDWRITING, &[("answer", "x = 42")]);
        assert!(prompt.contains("same handwriting style"));
        assert!(prompt.ends_with("x = 42"));
    }
}
