use crate::error::{RestError, Result};

/// Expand `{name}` placeholders, with `{{` and `}}` as literal braces.
///
/// `resolve` is called once per placeholder with the trimmed name inside the
/// braces; its error is returned as-is.
pub(crate) fn render<F>(template: &str, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(RestError::Template(format!(
                                "unterminated placeholder in '{}'",
                                template
                            )))
                        }
                    }
                }
                out.push_str(&resolve(name.trim())?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(RestError::Template(format!(
                    "single '}}' encountered in '{}'",
                    template
                )))
            }
            c => out.push(c),
        }
    }

    Ok(out)
}
