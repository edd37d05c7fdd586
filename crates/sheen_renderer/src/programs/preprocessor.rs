//! Conditional compilation for WGSL sources.
//!
//! WGSL has no preprocessor, so shader variants are selected with a small
//! line-based one: `#ifdef NAME`, `#ifndef NAME`, `#else` and `#endif`,
//! nestable. Directive lines and inactive lines are replaced by empty lines so
//! compiler diagnostics keep pointing at the right line of the source file.

use std::collections::BTreeSet;

/// Names switched on for one program variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    names: BTreeSet<String>,
}

impl ShaderDefines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>) -> &mut Self {
        self.names.insert(name.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.define(name);
        self
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct PreprocessError {
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}

struct Branch {
    opened_at: usize,
    taken: bool,
    seen_else: bool,
}

/// Resolves every conditional block of `source` against `defines`.
pub fn preprocess(source: &str, defines: &ShaderDefines) -> Result<String, PreprocessError> {
    let mut stack: Vec<Branch> = Vec::new();
    let mut output = String::with_capacity(source.len());

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        let error = |message: String| PreprocessError {
            line: line_no,
            message,
        };

        if let Some(rest) = trimmed.strip_prefix("#ifndef") {
            let name = directive_name(rest).ok_or_else(|| error("#ifndef needs a name".into()))?;
            stack.push(Branch {
                opened_at: line_no,
                taken: !defines.is_defined(name),
                seen_else: false,
            });
        } else if let Some(rest) = trimmed.strip_prefix("#ifdef") {
            let name = directive_name(rest).ok_or_else(|| error("#ifdef needs a name".into()))?;
            stack.push(Branch {
                opened_at: line_no,
                taken: defines.is_defined(name),
                seen_else: false,
            });
        } else if trimmed.starts_with("#else") {
            let branch = stack
                .last_mut()
                .ok_or_else(|| error("#else without a matching #ifdef".into()))?;
            if branch.seen_else {
                return Err(error(format!(
                    "second #else for the block opened at line {}",
                    branch.opened_at
                )));
            }
            branch.seen_else = true;
            branch.taken = !branch.taken;
        } else if trimmed.starts_with("#endif") {
            stack
                .pop()
                .ok_or_else(|| error("#endif without a matching #ifdef".into()))?;
        } else if stack.iter().all(|b| b.taken) {
            output.push_str(line);
        }
        output.push('\n');
    }

    if let Some(open) = stack.last() {
        return Err(PreprocessError {
            line: open.opened_at,
            message: "conditional block is never closed with #endif".into(),
        });
    }

    Ok(output)
}

fn directive_name(rest: &str) -> Option<&str> {
    // `#ifdefFOO` is not a directive for FOO.
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    rest.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "a\n#ifdef FOO\nfoo\n#else\nnot_foo\n#endif\n#ifndef BAR\nno_bar\n#endif\nz\n";

    fn kept_lines(output: &str) -> Vec<&str> {
        output.lines().filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn selects_branches_by_define() {
        let plain = preprocess(SOURCE, &ShaderDefines::new()).unwrap();
        assert_eq!(kept_lines(&plain), ["a", "not_foo", "no_bar", "z"]);

        let defines = ShaderDefines::new().with("FOO").with("BAR");
        let variant = preprocess(SOURCE, &defines).unwrap();
        assert_eq!(kept_lines(&variant), ["a", "foo", "z"]);
    }

    #[test]
    fn keeps_line_numbers_stable() {
        let output = preprocess(SOURCE, &ShaderDefines::new()).unwrap();
        assert_eq!(output.lines().count(), SOURCE.lines().count());
        assert_eq!(output.lines().nth(9), Some("z"));
    }

    #[test]
    fn nested_blocks_require_every_parent() {
        let source = "#ifdef A\n#ifdef B\nab\n#else\na_only\n#endif\n#endif\n";

        let none = preprocess(source, &ShaderDefines::new()).unwrap();
        assert!(kept_lines(&none).is_empty());

        let a = preprocess(source, &ShaderDefines::new().with("A")).unwrap();
        assert_eq!(kept_lines(&a), ["a_only"]);
    }

    #[test]
    fn reports_unbalanced_directives() {
        let err = preprocess("x\n#endif\n", &ShaderDefines::new()).unwrap_err();
        assert_eq!(err.line, 2);

        let err = preprocess("#ifdef A\nx\n", &ShaderDefines::new()).unwrap_err();
        assert_eq!(err.line, 1);

        let err = preprocess("#ifdef A\n#else\n#else\n#endif\n", &ShaderDefines::new()).unwrap_err();
        assert_eq!(err.line, 3);

        assert!(preprocess("#ifdef\n#endif\n", &ShaderDefines::new()).is_err());
    }

    #[test]
    fn error_message_leads_with_the_line() {
        let err = preprocess("x\n#endif\n", &ShaderDefines::new()).unwrap_err();
        assert_eq!(err.to_string(), "line 2: #endif without a matching #ifdef");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
