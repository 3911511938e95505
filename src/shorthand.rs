/// Parser for the one-line shorthand used in the config file, e.g.
///
/// ```text
/// NSUpdate("host.example.com", "secret")
/// Local('eth0', allow_private=true)
/// ```
///
/// Only a call-like form is accepted: a type name followed by a parenthesised
/// list of literal arguments (quoted strings, `true`/`false`, integers or
/// `None`), optionally named with `name=value`. Nothing is ever evaluated.
/// `None` leaves the parameter unset so its default applies.
use crate::error::ConfigError;
use std::iter::Peekable;
use std::str::Chars;

/// Argument value; `None` for an explicit `None`.
pub type Literal = Option<toml::Value>;

/// A parsed shorthand expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Shorthand {
    pub tag: String,
    pub positional: Vec<Literal>,
    pub named: Vec<(String, Literal)>,
}

impl Shorthand {
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        Parser::new(expr).parse().map_err(|reason| ConfigError::Shorthand {
            expr: expr.trim().to_string(),
            reason,
        })
    }

    /// Map the arguments onto named parameters, positionals in `params` order.
    pub fn into_args(self, params: &[&str]) -> Result<toml::Table, ConfigError> {
        let fail = |reason: String| ConfigError::InvalidArgs {
            tag: self.tag.clone(),
            reason,
        };

        if self.positional.len() > params.len() {
            return Err(fail(format!(
                "takes at most {} positional arguments but {} were given",
                params.len(),
                self.positional.len()
            )));
        }

        let given = &params[..self.positional.len()];
        let mut table = toml::Table::new();
        for (name, value) in given.iter().zip(self.positional.iter()) {
            if let Some(value) = value {
                table.insert(name.to_string(), value.clone());
            }
        }
        for (name, value) in &self.named {
            if given.contains(&name.as_str()) {
                return Err(fail(format!("got multiple values for argument '{}'", name)));
            }
            if let Some(value) = value {
                table.insert(name.clone(), value.clone());
            }
        }
        Ok(table)
    }
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self {
            chars: expr.chars().peekable(),
        }
    }

    fn parse(mut self) -> Result<Shorthand, String> {
        self.skip_whitespace();
        let tag = self.identifier().ok_or("expected a type name")?;
        self.skip_whitespace();
        self.expect('(')?;

        let mut positional = Vec::new();
        let mut named: Vec<(String, Literal)> = Vec::new();

        loop {
            self.skip_whitespace();
            if self.eat(')') {
                break;
            }

            match self.argument()? {
                (Some(name), value) => {
                    if named.iter().any(|(existing, _)| *existing == name) {
                        return Err(format!("argument '{}' given twice", name));
                    }
                    named.push((name, value));
                }
                (None, value) => {
                    if !named.is_empty() {
                        return Err("positional argument follows named argument".to_string());
                    }
                    positional.push(value);
                }
            }

            self.skip_whitespace();
            if self.eat(',') {
                continue;
            }
            self.expect(')')?;
            break;
        }

        self.skip_whitespace();
        if let Some(c) = self.chars.peek() {
            return Err(format!("unexpected '{}' after closing parenthesis", c));
        }

        Ok(Shorthand {
            tag,
            positional,
            named,
        })
    }

    /// `value` or `name=value`
    fn argument(&mut self) -> Result<(Option<String>, Literal), String> {
        match self.chars.peek() {
            Some('"') | Some('\'') => Ok((None, Some(self.string()?))),
            Some(c) if c.is_ascii_digit() || *c == '-' => Ok((None, Some(self.integer()?))),
            Some(_) => {
                let word = self.identifier().ok_or("expected an argument")?;
                self.skip_whitespace();
                if self.eat('=') {
                    self.skip_whitespace();
                    let value = self.value()?;
                    Ok((Some(word), value))
                } else {
                    Ok((None, keyword(&word)?))
                }
            }
            None => Err("unterminated argument list".to_string()),
        }
    }

    fn value(&mut self) -> Result<Literal, String> {
        match self.chars.peek() {
            Some('"') | Some('\'') => self.string().map(Some),
            Some(c) if c.is_ascii_digit() || *c == '-' => self.integer().map(Some),
            Some(_) => {
                let word = self.identifier().ok_or("expected a value")?;
                keyword(&word)
            }
            None => Err("expected a value".to_string()),
        }
    }

    fn string(&mut self) -> Result<toml::Value, String> {
        let quote = self.chars.next().ok_or("expected a string")?;
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => return Ok(toml::Value::String(out)),
                Some('\\') => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err("unterminated string".to_string()),
                },
                Some(c) => out.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn integer(&mut self) -> Result<toml::Value, String> {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || (digits.is_empty() && c == '-') {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        digits
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| format!("invalid number '{}'", digits))
    }

    fn identifier(&mut self) -> Option<String> {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            let valid = if ident.is_empty() {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_'
            };
            if !valid {
                break;
            }
            ident.push(c);
            self.chars.next();
        }
        (!ident.is_empty()).then_some(ident)
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if_eq(&expected).is_some()
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            match self.chars.peek() {
                Some(c) => Err(format!("expected '{}' but found '{}'", expected, c)),
                None => Err(format!("expected '{}' but reached the end", expected)),
            }
        }
    }
}

/// Bare words are only allowed for booleans and `None`; anything else would be a name
/// lookup.
fn keyword(word: &str) -> Result<Literal, String> {
    match word {
        "true" | "True" => Ok(Some(toml::Value::Boolean(true))),
        "false" | "False" => Ok(Some(toml::Value::Boolean(false))),
        "None" => Ok(None),
        _ => Err(format!("'{}' is not a literal (strings must be quoted)", word)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> toml::Value {
        toml::Value::String(value.to_string())
    }

    fn lit(value: &str) -> Literal {
        Some(s(value))
    }

    #[test]
    fn test_parse_positional_strings() {
        let parsed = Shorthand::parse(r#"  Web("ipv4_test_url", 'ipv6_test_url')  "#).unwrap();
        assert_eq!(parsed.tag, "Web");
        assert_eq!(parsed.positional, vec![lit("ipv4_test_url"), lit("ipv6_test_url")]);
        assert!(parsed.named.is_empty());
    }

    #[test]
    fn test_parse_empty_call() {
        let parsed = Shorthand::parse("Web()").unwrap();
        assert_eq!(parsed.tag, "Web");
        assert!(parsed.positional.is_empty());
    }

    #[test]
    fn test_parse_named_and_bool() {
        let parsed = Shorthand::parse("Local('eth0', allow_private = True,)").unwrap();
        assert_eq!(parsed.positional, vec![lit("eth0")]);
        assert_eq!(
            parsed.named,
            vec![("allow_private".to_string(), Some(toml::Value::Boolean(true)))]
        );
    }

    #[test]
    fn test_parse_escapes_and_integers() {
        let parsed = Shorthand::parse(r#"X("a\"b", -12, 7)"#).unwrap();
        assert_eq!(
            parsed.positional,
            vec![
                lit("a\"b"),
                Some(toml::Value::Integer(-12)),
                Some(toml::Value::Integer(7))
            ]
        );
    }

    #[test]
    fn test_unquoted_argument_rejected() {
        let err = Shorthand::parse("Web(ipv4_test_url, ipv6_test_url)").unwrap_err();
        assert!(err.to_string().contains("not a literal"));
    }

    #[test]
    fn test_malformed_expressions() {
        for expr in [
            "",
            "Web",
            "Web(",
            "Web(\"x\"",
            "Web(\"x\" \"y\")",
            "Web() + 1",
            "__import__('os').system('true')",
            "Web(a='x', 'y')",
            "Web(a='x', a='y')",
            "Web('unterminated)",
        ] {
            assert!(Shorthand::parse(expr).is_err(), "{:?} should not parse", expr);
        }
    }

    #[test]
    fn test_into_args() {
        let parsed = Shorthand::parse("NSUpdate('host.example.com', secret_key='abc')").unwrap();
        let table = parsed.into_args(&["hostname", "secret_key"]).unwrap();
        assert_eq!(table.get("hostname"), Some(&s("host.example.com")));
        assert_eq!(table.get("secret_key"), Some(&s("abc")));
    }

    #[test]
    fn test_none_leaves_parameter_unset() {
        let parsed =
            Shorthand::parse("StandardService('dyn.example.com', None, 'u', 'p', 'h')").unwrap();
        assert_eq!(parsed.positional[1], None);
        let table = parsed
            .into_args(&["service_ipv4", "service_ipv6", "username", "password", "hostname"])
            .unwrap();
        assert_eq!(table.len(), 4);
        assert!(!table.contains_key("service_ipv6"));
        assert_eq!(table.get("hostname"), Some(&s("h")));

        let parsed = Shorthand::parse("Web(ipv4_url=None)").unwrap();
        assert!(parsed.into_args(&["ipv4_url", "ipv6_url"]).unwrap().is_empty());
    }

    #[test]
    fn test_none_still_counts_as_given() {
        let parsed = Shorthand::parse("Web(None, ipv4_url='x')").unwrap();
        assert!(parsed.into_args(&["ipv4_url", "ipv6_url"]).is_err());
    }

    #[test]
    fn test_into_args_too_many() {
        let parsed = Shorthand::parse("Web('a', 'b', 'c')").unwrap();
        let err = parsed.into_args(&["ipv4_url", "ipv6_url"]).unwrap_err();
        assert!(err.to_string().contains("at most 2 positional"));
    }

    #[test]
    fn test_into_args_duplicate() {
        let parsed = Shorthand::parse("Web('a', ipv4_url='b')").unwrap();
        assert!(parsed.into_args(&["ipv4_url", "ipv6_url"]).is_err());
    }
}
