//! Small text utilities shared across handlers.

/// Unwrap a fenced code block if the oracle returned one despite being
/// told not to. A leading language tag line inside the fence is dropped.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let parts: Vec<&str> = trimmed.split("```").collect();
    if parts.len() >= 3 {
        let block = parts[1];
        let block = match block.split_once('\n') {
            Some((first, rest)) if is_language_tag(first) => rest,
            _ => block,
        };
        return block.trim().to_string();
    }
    trimmed.to_string()
}

fn is_language_tag(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_code_fences("print(1)\n"), "print(1)");
    }

    #[test]
    fn fenced_block_is_unwrapped() {
        assert_eq!(strip_code_fences("```\nprint(1)\n```"), "print(1)");
    }

    #[test]
    fn language_tag_is_dropped() {
        assert_eq!(strip_code_fences("```python\nprint(1)\n```"), "print(1)");
    }

    #[test]
    fn surrounding_prose_is_dropped_with_the_fence() {
        let text = "Here you go:\n```python\nx = 1\nprint(x)\n```\nHope that helps!";
        assert_eq!(strip_code_fences(text), "x = 1\nprint(x)");
    }

    #[test]
    fn unbalanced_fence_is_left_alone() {
        assert_eq!(strip_code_fences("```python\nprint(1)"), "```python\nprint(1)");
    }
}
