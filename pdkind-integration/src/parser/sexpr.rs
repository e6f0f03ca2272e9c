//! A minimal s-expression reader: the lexical substrate both the `mcmt`
//! and `chc` surface dialects parse into before lowering to
//! `pdkind_term::Term` (spec.md §6.2's command language). spec.md §1
//! keeps full frontend parsing an external collaborator; this reader is
//! the ambient, deliberately bounded front end that makes spec.md §8's
//! end-to-end scenarios runnable without a production parser
//! (`SPEC_FULL.md` §1).

use pdkind_ir::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sexpr {
    Atom(String),
    List(Vec<Sexpr>),
}

impl Sexpr {
    pub fn atom(&self) -> Option<&str> {
        match self {
            Sexpr::Atom(s) => Some(s),
            Sexpr::List(_) => None,
        }
    }

    pub fn list(&self) -> Option<&[Sexpr]> {
        match self {
            Sexpr::List(xs) => Some(xs),
            Sexpr::Atom(_) => None,
        }
    }
}

/// Reads every top-level form in `text`.
pub fn parse_all(text: &str) -> Result<Vec<Sexpr>, Error> {
    let tokens = tokenize(text);
    let mut pos = 0;
    let mut out = Vec::new();
    while pos < tokens.len() {
        out.push(parse_one(&tokens, &mut pos)?);
    }
    Ok(out)
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ';' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' => {
                tokens.push(c.to_string());
                chars.next();
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == ';' {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(atom);
            }
        }
    }
    tokens
}

fn parse_one(tokens: &[String], pos: &mut usize) -> Result<Sexpr, Error> {
    let tok = tokens
        .get(*pos)
        .ok_or_else(|| Error::Parse("unexpected end of input".into()))?;
    if tok == "(" {
        *pos += 1;
        let mut items = Vec::new();
        loop {
            match tokens.get(*pos) {
                Some(t) if t == ")" => {
                    *pos += 1;
                    break;
                }
                Some(_) => items.push(parse_one(tokens, pos)?),
                None => return Err(Error::Parse("unterminated list".into())),
            }
        }
        Ok(Sexpr::List(items))
    } else if tok == ")" {
        Err(Error::Parse("unexpected ')'".into()))
    } else {
        *pos += 1;
        Ok(Sexpr::Atom(tok.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_lists() {
        let forms = parse_all("(and (= x 0) (not y))").unwrap();
        assert_eq!(forms.len(), 1);
        assert!(forms[0].list().unwrap()[0].atom() == Some("and"));
    }

    #[test]
    fn skips_comments() {
        let forms = parse_all("; a comment\n(lemma s 0 x)").unwrap();
        assert_eq!(forms.len(), 1);
    }

    #[test]
    fn rejects_unterminated_list() {
        assert!(parse_all("(and x").is_err());
    }
}
