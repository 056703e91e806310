//! Parser for dialog scripts, the text form of a definition's parameter layout.
//!
//! # Grammar
//!
//! ```text
//! {
//!     name    tower
//!     parm {
//!         name    "build"
//!         type    button
//!         parmtag { "script_callback" "hou.phm().build(kwargs)" }
//!         parmtag { "script_callback_language" "python" }
//!     }
//!     groupsimple {
//!         name    "folder0"
//!         parm {
//!             name    "style"
//!             type    string
//!             menureplace {
//!                 [ "result = []" ]
//!                 [ "return result" ]
//!                 language python
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! The file is a tree of `{}` blocks and `[]` lists holding bare words and
//! double-quoted strings. Every `parm` block, however deeply nested inside
//! folders or multiparms, becomes one [`Parameter`].

use thiserror::Error;

use super::{ParmKind, Parameter, ScriptLanguage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
  #[error("unterminated string starting on line {line}")]
  UnterminatedString { line: usize },

  #[error("unexpected '{found}' on line {line}")]
  Unbalanced { found: char, line: usize },

  #[error("unclosed '{open}' opened on line {line}")]
  Unclosed { open: char, line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
  Word(String),
  Text(String),
  Block(Vec<Node>),
  List(Vec<Node>),
}

impl Node {
  /// A bare word or quoted string.
  fn atom(&self) -> Option<&str> {
    match self {
      Node::Word(text) | Node::Text(text) => Some(text),
      _ => None,
    }
  }

  /// Keywords are always bare words.
  fn keyword(&self) -> Option<&str> {
    match self {
      Node::Word(text) => Some(text),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
  Word(String),
  Text(String),
  Open(char, usize),
  Close(char, usize),
}

fn tokenize(source: &str) -> Result<Vec<Token>, DialogError> {
  let mut tokens = Vec::new();
  let mut chars = source.chars().peekable();
  let mut line = 1;

  while let Some(c) = chars.next() {
    match c {
      '\n' => line += 1,
      c if c.is_whitespace() => {}
      '#' => {
        for next in chars.by_ref() {
          if next == '\n' {
            line += 1;
            break;
          }
        }
      }
      '{' | '[' => tokens.push(Token::Open(c, line)),
      '}' | ']' => tokens.push(Token::Close(c, line)),
      '"' => {
        let start = line;
        let mut text = String::new();
        let mut closed = false;
        while let Some(next) = chars.next() {
          match next {
            '"' => {
              closed = true;
              break;
            }
            '\\' => match chars.next() {
              Some('n') => text.push('\n'),
              Some('t') => text.push('\t'),
              Some(escaped) => {
                if escaped == '\n' {
                  line += 1;
                }
                text.push(escaped);
              }
              None => break,
            },
            other => {
              if other == '\n' {
                line += 1;
              }
              text.push(other);
            }
          }
        }
        if !closed {
          return Err(DialogError::UnterminatedString { line: start });
        }
        tokens.push(Token::Text(text));
      }
      _ => {
        let mut word = String::from(c);
        while let Some(&next) = chars.peek() {
          if next.is_whitespace() || matches!(next, '{' | '}' | '[' | ']' | '"') {
            break;
          }
          word.push(next);
          chars.next();
        }
        tokens.push(Token::Word(word));
      }
    }
  }

  Ok(tokens)
}

fn build_tree(tokens: Vec<Token>) -> Result<Vec<Node>, DialogError> {
  // Each frame is (opening delimiter, line, children).
  let mut stack: Vec<(char, usize, Vec<Node>)> = vec![(' ', 0, Vec::new())];

  for token in tokens {
    match token {
      Token::Word(text) => {
        if let Some(frame) = stack.last_mut() {
          frame.2.push(Node::Word(text));
        }
      }
      Token::Text(text) => {
        if let Some(frame) = stack.last_mut() {
          frame.2.push(Node::Text(text));
        }
      }
      Token::Open(open, line) => stack.push((open, line, Vec::new())),
      Token::Close(close, line) => {
        let expected = if close == '}' { '{' } else { '[' };
        if stack.len() < 2 || stack.last().map(|frame| frame.0) != Some(expected) {
          return Err(DialogError::Unbalanced { found: close, line });
        }
        if let Some((open, _, children)) = stack.pop() {
          let node = if open == '{' {
            Node::Block(children)
          } else {
            Node::List(children)
          };
          if let Some(parent) = stack.last_mut() {
            parent.2.push(node);
          }
        }
      }
    }
  }

  if stack.len() > 1 {
    let (open, line, _) = &stack[stack.len() - 1];
    return Err(DialogError::Unclosed { open: *open, line: *line });
  }

  Ok(stack.pop().map(|frame| frame.2).unwrap_or_default())
}

/// Map a dialog script `type` keyword onto a parameter kind.
pub fn parm_kind(type_keyword: &str) -> ParmKind {
  match type_keyword {
    "string" | "file" | "image" | "geometry" | "buffer" | "oppath" | "oplist" | "directory" | "keyvaluedict" => {
      ParmKind::String
    }
    "ordinal" => ParmKind::Menu,
    "integer" => ParmKind::Integer,
    _ => ParmKind::Other,
  }
}

/// Parse a dialog script into its parameters, in declaration order.
pub fn parse_parameters(source: &str) -> Result<Vec<Parameter>, DialogError> {
  let tree = build_tree(tokenize(source)?)?;
  let mut parameters = Vec::new();
  collect_parameters(&tree, &mut parameters);
  Ok(parameters)
}

fn collect_parameters(nodes: &[Node], out: &mut Vec<Parameter>) {
  let mut index = 0;
  while index < nodes.len() {
    match (&nodes[index], nodes.get(index + 1)) {
      (Node::Word(keyword), Some(Node::Block(body))) if keyword == "parm" => {
        out.push(parse_parm(body));
        index += 2;
        continue;
      }
      (Node::Block(body), _) => collect_parameters(body, out),
      _ => {}
    }
    index += 1;
  }
}

fn parse_parm(body: &[Node]) -> Parameter {
  let mut name = String::new();
  let mut kind = ParmKind::Other;
  let mut callback = String::new();
  let mut callback_language = ScriptLanguage::Hscript;
  let mut item_generator = String::new();
  let mut item_generator_language = ScriptLanguage::Hscript;

  let mut index = 0;
  while index < body.len() {
    let keyword = body[index].keyword();
    let value = body.get(index + 1);
    let consumed = match (keyword, value.and_then(Node::atom), value) {
      (Some("name"), Some(text), _) => {
        name = text.to_string();
        true
      }
      (Some("type"), Some(text), _) => {
        kind = parm_kind(text);
        true
      }
      (Some("parmtag"), _, Some(Node::Block(tag))) => {
        let mut atoms = tag.iter().filter_map(Node::atom);
        if let (Some(key), Some(tag_value)) = (atoms.next(), atoms.next()) {
          match key {
            "script_callback" => callback = tag_value.to_string(),
            "script_callback_language" => callback_language = ScriptLanguage::from_tag(tag_value),
            _ => {}
          }
        }
        true
      }
      (Some("menu" | "menureplace" | "menutoggle"), _, Some(Node::Block(menu))) => {
        let (script, language) = parse_menu(menu);
        item_generator = script;
        item_generator_language = language;
        true
      }
      _ => false,
    };
    index += if consumed { 2 } else { 1 };
  }

  Parameter {
    name,
    kind,
    callback,
    callback_language,
    item_generator,
    item_generator_language,
  }
}

fn parse_menu(body: &[Node]) -> (String, ScriptLanguage) {
  let mut lines = Vec::new();
  let mut language = ScriptLanguage::Hscript;

  let mut index = 0;
  while index < body.len() {
    match &body[index] {
      Node::List(items) => {
        lines.extend(items.iter().filter_map(Node::atom).map(str::to_string));
      }
      Node::Word(keyword) if keyword == "language" => {
        if let Some(tag) = body.get(index + 1).and_then(Node::atom) {
          language = ScriptLanguage::from_tag(tag);
          index += 1;
        }
      }
      _ => {}
    }
    index += 1;
  }

  (lines.join("\n"), language)
}
